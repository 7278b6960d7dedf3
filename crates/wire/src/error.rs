use fanout_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the messaging layer.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

impl From<WireError> for CoreError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Timeout(after) => CoreError::Timeout(after),
            WireError::Remote(message) => CoreError::Remote(message),
            other => CoreError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeout_stays_a_timeout() {
        let err: CoreError = WireError::Timeout(Duration::from_millis(250)).into();
        assert_eq!(err, CoreError::Timeout(Duration::from_millis(250)));
    }

    #[test]
    fn socket_failures_become_transport_errors() {
        let err: CoreError = WireError::Transport("peer gone".into()).into();
        assert!(matches!(err, CoreError::Transport(msg) if msg.contains("peer gone")));
    }
}
