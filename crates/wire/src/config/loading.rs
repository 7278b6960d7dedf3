use std::path::Path;
use std::time::Duration;

use crate::error::WireError;
use crate::transport::Transport;

use super::helpers::{millis, override_from_env, parse_endpoint_to_transport};
use super::types::{ComputerConfig, FanoutConfig, SpaceConfig, TransportConfig};

impl FanoutConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, WireError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WireError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, else start from [`FanoutConfig::local`] with
    /// environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self, WireError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Self::local();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Single-host deployment over IPC sockets.
    pub fn local() -> Self {
        Self {
            space: SpaceConfig::default(),
            computer: ComputerConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    /// Multi-host deployment over TCP. The Space listens on `port` and a
    /// worker's service defaults to `port + 1` on the same host.
    pub fn distributed(host: &str, port: u16) -> Self {
        Self {
            space: SpaceConfig {
                endpoint: format!("tcp://{host}:{port}"),
                ..SpaceConfig::default()
            },
            computer: ComputerConfig {
                endpoint: format!("tcp://{host}:{}", port.saturating_add(1)),
                ..ComputerConfig::default()
            },
            transport: TransportConfig { kind: "tcp".into() },
        }
    }

    pub fn space_transport(&self) -> Result<Transport, WireError> {
        parse_endpoint_to_transport("space.endpoint", &self.space.endpoint)
    }

    pub fn computer_transport(&self) -> Result<Transport, WireError> {
        parse_endpoint_to_transport("computer.endpoint", &self.computer.endpoint)
    }

    pub fn space_call_timeout(&self) -> Duration {
        millis(self.space.call_timeout_ms)
    }

    pub fn computer_call_timeout(&self) -> Duration {
        millis(self.computer.call_timeout_ms)
    }

    pub fn take_wait(&self) -> Duration {
        millis(self.space.take_wait_ms)
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Convention: `FANOUT_SECTION_KEY` overrides `section.key`.
    pub(crate) fn apply_env_overrides(&mut self) {
        override_from_env("FANOUT_SPACE_ENDPOINT", &mut self.space.endpoint);
        override_from_env("FANOUT_SPACE_TAKE_WAIT_MS", &mut self.space.take_wait_ms);
        override_from_env("FANOUT_SPACE_CALL_TIMEOUT_MS", &mut self.space.call_timeout_ms);
        override_from_env("FANOUT_COMPUTER_ENDPOINT", &mut self.computer.endpoint);
        override_from_env("FANOUT_COMPUTER_THREADS", &mut self.computer.threads);
        override_from_env("FANOUT_COMPUTER_CALL_TIMEOUT_MS", &mut self.computer.call_timeout_ms);
        override_from_env("FANOUT_TRANSPORT_KIND", &mut self.transport.kind);
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self::local()
    }
}
