pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod messages;
pub mod reqrep;
pub mod traits;
pub mod transport;

pub use client::{ComputerClient, ProxyLink, SpaceClient};
pub use config::{ComputerConfig, FanoutConfig, SpaceConfig, TransportConfig};
pub use error::WireError;
pub use message::Message;
pub use messages::topics;
pub use messages::{ComputerReply, ComputerRequest, SpaceReply, SpaceRequest};
pub use reqrep::{ReplyToken, ZmqRequestClient, ZmqRequestServer};
pub use traits::{RequestHandler, RequestSender};
pub use transport::Transport;
