use std::time::Duration;

use async_trait::async_trait;

use crate::error::WireError;
use crate::message::Message;
use crate::reqrep::ReplyToken;

/// Issues requests and awaits the matching reply.
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Send `msg` and wait up to `timeout` for the reply sharing its
    /// correlation id.
    async fn request(&self, msg: Message, timeout: Duration) -> Result<Message, WireError>;
}

/// Serves requests from any number of connected peers.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Next request, with the token needed to answer it.
    async fn recv_request(&self) -> Result<(ReplyToken, Message), WireError>;

    async fn send_reply(&self, token: ReplyToken, reply: Message) -> Result<(), WireError>;
}
