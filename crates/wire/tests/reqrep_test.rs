//! Integration tests for DEALER/ROUTER request/reply and the typed stubs.

use std::sync::Arc;
use std::time::Duration;

use fanout_core::{Computer, CoreError, Shared};
use fanout_wire::{
    topics, ComputerClient, ComputerReply, ComputerRequest, Message, RequestHandler,
    RequestSender, Transport, WireError, ZmqRequestClient, ZmqRequestServer,
};

const SETTLE: Duration = Duration::from_millis(200);
const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn single_request_reply() {
    let transport = Transport::tcp("127.0.0.1", 17500);

    let server = ZmqRequestServer::bind(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;
    let client = ZmqRequestClient::connect(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let request = Message::new("fanout.test", &"ping".to_string()).unwrap();
    let cid = request.correlation_id;

    let server_handle = tokio::spawn(async move {
        let (token, msg) = server.recv_request().await.unwrap();
        assert_eq!(msg.decode::<String>().unwrap(), "ping");
        let reply = msg.reply("fanout.test.reply", &"pong".to_string()).unwrap();
        server.send_reply(token, reply).await.unwrap();
    });

    let reply = client.request(request, TIMEOUT).await.unwrap();
    assert_eq!(reply.correlation_id, cid);
    assert_eq!(reply.decode::<String>().unwrap(), "pong");

    server_handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn replies_out_of_order_reach_their_callers() {
    let transport = Transport::tcp("127.0.0.1", 17510);

    let server = ZmqRequestServer::bind(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;
    let client = Arc::new(ZmqRequestClient::connect(&transport).await.unwrap());
    tokio::time::sleep(SETTLE).await;

    const N: u32 = 5;
    // Collect every request first, then answer newest first.
    let server_handle = tokio::spawn(async move {
        let mut held = Vec::new();
        for _ in 0..N {
            held.push(server.recv_request().await.unwrap());
        }
        for (token, msg) in held.into_iter().rev() {
            let value: u32 = msg.decode().unwrap();
            let reply = msg.reply("fanout.test.reply", &(value * 10)).unwrap();
            server.send_reply(token, reply).await.unwrap();
        }
    });

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let msg = Message::new("fanout.test", &i).unwrap();
                let reply = client.request(msg, TIMEOUT).await.unwrap();
                (i, reply.decode::<u32>().unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (sent, got) = handle.await.unwrap();
        assert_eq!(got, sent * 10);
    }
    server_handle.await.unwrap();
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let transport = Transport::tcp("127.0.0.1", 17520);

    let _server = ZmqRequestServer::bind(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;
    let client = ZmqRequestClient::connect(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let msg = Message::new("fanout.test", &0u8).unwrap();
    let err = client.request(msg, Duration::from_millis(300)).await.unwrap_err();
    assert!(matches!(err, WireError::Timeout(_)));
}

#[tokio::test]
async fn computer_client_speaks_the_computer_protocol() {
    let transport = Transport::tcp("127.0.0.1", 17530);

    let server = ZmqRequestServer::bind(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let server_handle = tokio::spawn(async move {
        for _ in 0..2 {
            let (token, msg) = server.recv_request().await.unwrap();
            assert_eq!(msg.topic, topics::COMPUTER_REQUEST);
            let reply = match msg.decode::<ComputerRequest>().unwrap() {
                ComputerRequest::GetShared => ComputerReply::Shared(Some(Shared::new(12.5))),
                ComputerRequest::Shutdown => ComputerReply::Error {
                    message: "already stopping".into(),
                },
                other => panic!("unexpected request {other:?}"),
            };
            let reply = msg.reply(topics::COMPUTER_REPLY, &reply).unwrap();
            server.send_reply(token, reply).await.unwrap();
        }
    });

    let computer = ComputerClient::connect(&transport, TIMEOUT).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    assert_eq!(computer.get_shared().await.unwrap(), Some(Shared::new(12.5)));
    assert_eq!(
        computer.shutdown().await,
        Err(CoreError::Remote("already stopping".into()))
    );
    server_handle.await.unwrap();
}
