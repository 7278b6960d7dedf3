use std::path::Path;

use crate::error::WireError;

/// Directory holding IPC socket files.
pub const IPC_DIR: &str = "/tmp/fanout";

/// Where a ZeroMQ socket binds or connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Unix domain socket under [`IPC_DIR`]. Same-host only.
    Ipc(String),

    Tcp { host: String, port: u16 },
}

impl Transport {
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(name.to_string())
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Parse `ipc:///tmp/fanout/name.sock` or `tcp://host:port`.
    pub fn parse(endpoint: &str) -> Result<Self, WireError> {
        if let Some(path) = endpoint.strip_prefix("ipc://") {
            let name = Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    WireError::Config(format!("ipc endpoint '{endpoint}' has no socket name"))
                })?;
            Ok(Self::ipc(name))
        } else if let Some(addr) = endpoint.strip_prefix("tcp://") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| {
                    WireError::Config(format!("tcp endpoint '{endpoint}' has no port"))
                })?;
            let port = port
                .parse()
                .map_err(|_| {
                    WireError::Config(format!("tcp endpoint '{endpoint}' has an invalid port"))
                })?;
            if host.is_empty() {
                return Err(WireError::Config(format!("tcp endpoint '{endpoint}' has no host")));
            }
            Ok(Self::tcp(host, port))
        } else {
            Err(WireError::Config(format!(
                "endpoint '{endpoint}' must start with ipc:// or tcp://"
            )))
        }
    }

    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(name) => format!("ipc://{IPC_DIR}/{name}.sock"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// ZeroMQ needs the IPC directory to exist before binding.
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Self::Ipc(_) = self {
            std::fs::create_dir_all(IPC_DIR)?;
        }
        Ok(())
    }

    /// Remove a socket file left behind by a previous run, which would
    /// otherwise fail the bind with `EADDRINUSE`.
    pub fn remove_stale_socket(&self) -> std::io::Result<()> {
        if let Self::Ipc(name) = self {
            let path = format!("{IPC_DIR}/{name}.sock");
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path, "removed stale IPC socket"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_endpoint() {
        assert_eq!(Transport::ipc("space").endpoint(), "ipc:///tmp/fanout/space.sock");
    }

    #[test]
    fn parse_round_trips_both_kinds() {
        for t in [Transport::ipc("computer-1"), Transport::tcp("10.0.0.5", 17000)] {
            assert_eq!(Transport::parse(&t.endpoint()).unwrap(), t);
        }
    }

    #[test]
    fn parse_rejects_unknown_scheme_and_bad_port() {
        assert!(Transport::parse("udp://host:1").is_err());
        assert!(Transport::parse("tcp://host:notaport").is_err());
        assert!(Transport::parse("tcp://host").is_err());
    }
}
