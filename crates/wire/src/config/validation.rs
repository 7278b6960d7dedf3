use super::helpers::parse_endpoint_to_transport;
use super::types::FanoutConfig;
use crate::error::WireError;
use crate::transport::Transport;

impl FanoutConfig {
    /// Check endpoints, transport kind and timeouts.
    pub fn validate(&self) -> Result<(), WireError> {
        self.validate_transport_kind()?;
        self.validate_endpoints()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_transport_kind(&self) -> Result<(), WireError> {
        match self.transport.kind.as_str() {
            "ipc" | "tcp" => Ok(()),
            other => Err(WireError::Config(format!(
                "invalid transport kind '{other}', expected 'ipc' or 'tcp'"
            ))),
        }
    }

    /// Every endpoint must parse and use the configured transport kind.
    fn validate_endpoints(&self) -> Result<(), WireError> {
        for (key, endpoint) in [
            ("space.endpoint", &self.space.endpoint),
            ("computer.endpoint", &self.computer.endpoint),
        ] {
            let kind = match parse_endpoint_to_transport(key, endpoint)? {
                Transport::Ipc(_) => "ipc",
                Transport::Tcp { .. } => "tcp",
            };
            if kind != self.transport.kind {
                return Err(WireError::Config(format!(
                    "{key} '{endpoint}' uses {kind} but transport.kind is '{}'",
                    self.transport.kind
                )));
            }
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), WireError> {
        for (key, value) in [
            ("space.take_wait_ms", self.space.take_wait_ms),
            ("space.call_timeout_ms", self.space.call_timeout_ms),
            ("computer.call_timeout_ms", self.computer.call_timeout_ms),
        ] {
            if value == 0 {
                return Err(WireError::Config(format!("{key} must be greater than zero")));
            }
        }
        if self.space.take_wait_ms >= self.space.call_timeout_ms {
            return Err(WireError::Config(
                "space.take_wait_ms must be shorter than space.call_timeout_ms".into(),
            ));
        }
        Ok(())
    }
}
