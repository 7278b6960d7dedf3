use std::time::Duration;

use crate::error::WireError;
use crate::transport::Transport;

/// Parse an endpoint, naming the config key in the error.
pub(crate) fn parse_endpoint_to_transport(
    key: &str,
    endpoint: &str,
) -> Result<Transport, WireError> {
    Transport::parse(endpoint).map_err(|e| WireError::Config(format!("{key}: {e}")))
}

pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Set `target` from the environment variable `key` when it parses.
pub(crate) fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable environment override"),
        }
    }
}
