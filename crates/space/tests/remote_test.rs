//! A Space and a worker talking over TCP, driven by a remote client.

use std::sync::Arc;
use std::time::Duration;

use fanout_computer::{ComputerService, LocalComputer};
use fanout_core::{ComputeSpace, Fibonacci, ResultValue, Task, Workload};
use fanout_space::{Space, SpaceService};
use fanout_wire::{ProxyLink, SpaceClient, Transport};

const SETTLE: Duration = Duration::from_millis(200);
const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fibonacci_over_tcp() {
    let space_transport = Transport::tcp("127.0.0.1", 17600);
    let computer_transport = Transport::tcp("127.0.0.1", 17601);

    let space = Space::new();
    let space_service = SpaceService::bind(space.clone(), &space_transport, TIMEOUT).await.unwrap();
    let space_handle = tokio::spawn(async move { space_service.run().await });

    let computer = Arc::new(LocalComputer::new(2).unwrap());
    let computer_service = ComputerService::bind(computer.clone(), &computer_transport)
        .await
        .unwrap();
    let computer_handle = tokio::spawn(async move { computer_service.run().await });
    tokio::time::sleep(SETTLE).await;

    // Worker side: register and route outcomes back through the proxy.
    let link_client = Arc::new(
        SpaceClient::connect(&space_transport, TIMEOUT, Duration::from_millis(500))
            .await
            .unwrap(),
    );
    tokio::time::sleep(SETTLE).await;
    let proxy_id = link_client
        .register(&computer_transport.endpoint(), computer.capacity())
        .await
        .unwrap();
    assert!(computer.attach(Arc::new(ProxyLink::new(link_client, proxy_id))));
    assert!(space.proxy(proxy_id).is_some());

    let client = SpaceClient::connect(&space_transport, TIMEOUT, Duration::from_millis(500))
        .await
        .unwrap();
    tokio::time::sleep(SETTLE).await;

    let task = Task::new(Workload::Fibonacci(Fibonacci::new(10)));
    let result = tokio::time::timeout(TIMEOUT, client.compute(task, None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.value(), Some(&ResultValue::Fibonacci(55)));

    client.shutdown().await.unwrap();
    tokio::time::timeout(TIMEOUT, space_handle).await.unwrap().unwrap().unwrap();
    tokio::time::timeout(TIMEOUT, computer_handle).await.unwrap().unwrap().unwrap();
    assert!(space.is_shut_down());
    assert!(computer.is_shut_down());
}
