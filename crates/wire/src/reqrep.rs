//! Request/reply over ZeroMQ DEALER/ROUTER sockets.
//!
//! Both ends hand their socket to a background event loop, so sends and
//! receives never contend for a lock and a slow handler cannot stall other
//! peers.
//!
//! ## Framing (zeromq-rs 0.4)
//!
//! - DEALER sends: `[topic, envelope]`
//! - ROUTER receives: `[identity, topic, envelope]`
//! - ROUTER sends: `[identity, topic, envelope]`
//! - DEALER receives: `[topic, envelope]`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use zeromq::prelude::*;
use zeromq::{DealerSocket, RouterSocket, ZmqMessage};

use crate::error::WireError;
use crate::message::Message;
use crate::traits::{RequestHandler, RequestSender};
use crate::transport::Transport;

const CHANNEL_CAPACITY: usize = 256;

/// Routing identity of the peer that sent a request. Must be handed back
/// with the reply.
#[derive(Debug, Clone)]
pub struct ReplyToken {
    identity: Vec<u8>,
}

type Pending = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Message>>>>;

/// Strip leading empty delimiter frames and decode `[topic, envelope]`.
fn decode_frames<'a>(frames: impl Iterator<Item = &'a [u8]>) -> Result<Message, WireError> {
    let data: Vec<&[u8]> = frames.skip_while(|f| f.is_empty()).collect();
    match data.as_slice() {
        [_topic, envelope, ..] => Ok(Message::from_bytes(envelope)?),
        _ => Err(WireError::Transport(format!(
            "expected [topic, envelope], got {} data frames",
            data.len()
        ))),
    }
}

fn encode_frames(message: &Message) -> Result<ZmqMessage, WireError> {
    let mut zmq_msg = ZmqMessage::from(message.topic.as_str());
    zmq_msg.push_back(message.to_bytes()?.into());
    Ok(zmq_msg)
}

/// DEALER-socket client. Replies are matched to callers by correlation id.
pub struct ZmqRequestClient {
    send_tx: mpsc::Sender<ZmqMessage>,
    pending: Pending,
    loop_handle: JoinHandle<()>,
}

impl ZmqRequestClient {
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, WireError> {
        let mut socket = DealerSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting DEALER socket");
        socket.connect(&endpoint).await?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (send_tx, send_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let loop_handle = tokio::spawn(Self::event_loop(socket, send_rx, Arc::clone(&pending)));

        Ok(Self {
            send_tx,
            pending,
            loop_handle,
        })
    }

    async fn event_loop(
        mut socket: DealerSocket,
        mut send_rx: mpsc::Receiver<ZmqMessage>,
        pending: Pending,
    ) {
        loop {
            tokio::select! {
                Some(zmq_msg) = send_rx.recv() => {
                    if let Err(e) = socket.send(zmq_msg).await {
                        warn!(error = %e, "DEALER send failed");
                    }
                }
                result = socket.recv() => {
                    match result {
                        Ok(zmq_msg) => Self::dispatch_reply(&pending, zmq_msg).await,
                        Err(e) => {
                            debug!(error = %e, "DEALER recv loop ending");
                            break;
                        }
                    }
                }
                else => break,
            }
        }
        // Waiting callers see their sender dropped.
        pending.lock().await.clear();
    }

    async fn dispatch_reply(
        pending: &Mutex<HashMap<Uuid, oneshot::Sender<Message>>>,
        zmq_msg: ZmqMessage,
    ) {
        let message = match decode_frames(zmq_msg.iter().map(|f| f.as_ref())) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "dropping undecodable reply");
                return;
            }
        };

        let cid = message.correlation_id;
        match pending.lock().await.remove(&cid) {
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => debug!(correlation_id = %cid, "reply for unknown or expired request"),
        }
    }
}

impl Drop for ZmqRequestClient {
    fn drop(&mut self) {
        self.loop_handle.abort();
    }
}

#[async_trait]
impl RequestSender for ZmqRequestClient {
    async fn request(&self, msg: Message, timeout: Duration) -> Result<Message, WireError> {
        let cid = msg.correlation_id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(cid, tx);

        let zmq_msg = encode_frames(&msg)?;
        if self.send_tx.send(zmq_msg).await.is_err() {
            self.pending.lock().await.remove(&cid);
            return Err(WireError::Transport("client event loop closed".into()));
        }
        debug!(correlation_id = %cid, topic = %msg.topic, "sent request");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(WireError::Transport("connection closed before reply".into())),
            Err(_) => {
                self.pending.lock().await.remove(&cid);
                Err(WireError::Timeout(timeout))
            }
        }
    }
}

/// ROUTER-socket server. Incoming requests queue on a channel; replies are
/// sent from another, so any number of requests can be in progress at once.
/// Dropping the server closes the reply channel, which ends the event loop
/// once queued replies are flushed.
pub struct ZmqRequestServer {
    requests: Mutex<mpsc::Receiver<(ReplyToken, Message)>>,
    replies: mpsc::Sender<ZmqMessage>,
    _loop_handle: JoinHandle<()>,
}

impl ZmqRequestServer {
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(transport: &Transport) -> Result<Self, WireError> {
        transport.ensure_ipc_dir()?;
        transport.remove_stale_socket()?;
        let mut socket = RouterSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding ROUTER socket");
        socket.bind(&endpoint).await?;

        let (request_tx, request_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (reply_tx, reply_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let loop_handle = tokio::spawn(Self::event_loop(socket, request_tx, reply_rx));

        Ok(Self {
            requests: Mutex::new(request_rx),
            replies: reply_tx,
            _loop_handle: loop_handle,
        })
    }

    async fn event_loop(
        mut socket: RouterSocket,
        request_tx: mpsc::Sender<(ReplyToken, Message)>,
        mut reply_rx: mpsc::Receiver<ZmqMessage>,
    ) {
        loop {
            tokio::select! {
                reply = reply_rx.recv() => {
                    // Replies queued before the server was dropped still go out.
                    let Some(zmq_msg) = reply else {
                        debug!("ROUTER reply channel closed");
                        break;
                    };
                    if let Err(e) = socket.send(zmq_msg).await {
                        warn!(error = %e, "ROUTER send failed");
                    }
                }
                result = socket.recv() => {
                    let zmq_msg = match result {
                        Ok(m) => m,
                        Err(e) => {
                            debug!(error = %e, "ROUTER recv loop ending");
                            break;
                        }
                    };
                    let mut frames = zmq_msg.iter().map(|f| f.as_ref());
                    let Some(identity) = frames.next() else {
                        continue;
                    };
                    let identity = identity.to_vec();
                    match decode_frames(frames) {
                        Ok(message) => {
                            debug!(
                                correlation_id = %message.correlation_id,
                                topic = %message.topic,
                                "received request"
                            );
                            if request_tx.send((ReplyToken { identity }, message)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "dropping undecodable request"),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl RequestHandler for ZmqRequestServer {
    async fn recv_request(&self) -> Result<(ReplyToken, Message), WireError> {
        self.requests
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| WireError::Transport("server event loop closed".into()))
    }

    /// Frames sent: `[identity, topic, envelope]`; ROUTER pops the identity.
    async fn send_reply(&self, token: ReplyToken, reply: Message) -> Result<(), WireError> {
        let mut zmq_msg = ZmqMessage::from(token.identity);
        zmq_msg.push_back(reply.topic.as_bytes().to_vec().into());
        zmq_msg.push_back(reply.to_bytes()?.into());

        self.replies
            .send(zmq_msg)
            .await
            .map_err(|_| WireError::Transport("server event loop closed".into()))?;
        debug!(correlation_id = %reply.correlation_id, topic = %reply.topic, "queued reply");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_skips_delimiters() {
        let msg = Message::new("fanout.space.reply", &7u32).unwrap();
        let bytes = msg.to_bytes().unwrap();
        let frames: [&[u8]; 3] = [b"", b"fanout.space.reply", &bytes];
        let decoded = decode_frames(frames.into_iter()).unwrap();
        assert_eq!(decoded.correlation_id, msg.correlation_id);
    }

    #[test]
    fn decode_rejects_short_message() {
        let frames: [&[u8]; 1] = [b"topic-only"];
        assert!(decode_frames(frames.into_iter()).is_err());
    }
}
