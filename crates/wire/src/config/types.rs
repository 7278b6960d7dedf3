use serde::{Deserialize, Serialize};

/// Full configuration shared by the Space, worker and client binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanoutConfig {
    #[serde(default)]
    pub space: SpaceConfig,

    #[serde(default)]
    pub computer: ComputerConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

// ── Section configs ─────────────────────────────────────────────────

/// The coordinator's service endpoint and client-facing timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceConfig {
    #[serde(default = "default_space_endpoint")]
    pub endpoint: String,

    /// How long one `take` long-poll waits before replying `Empty`.
    #[serde(default = "default_take_wait_ms")]
    pub take_wait_ms: u64,

    /// Timeout for calls made to the Space.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_space_endpoint() -> String {
    "ipc:///tmp/fanout/space.sock".into()
}

fn default_take_wait_ms() -> u64 {
    1_000
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_space_endpoint(),
            take_wait_ms: default_take_wait_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

/// A worker's own service endpoint and execution pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerConfig {
    #[serde(default = "default_computer_endpoint")]
    pub endpoint: String,

    /// Execution threads; 0 means one per available core.
    #[serde(default)]
    pub threads: usize,

    /// Timeout for calls the Space makes to this worker and the worker
    /// makes back to the Space.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_computer_endpoint() -> String {
    "ipc:///tmp/fanout/computer.sock".into()
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_computer_endpoint(),
            threads: 0,
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

/// Transport kind every endpoint must use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// `"ipc"` or `"tcp"`.
    #[serde(default = "default_transport_kind")]
    pub kind: String,
}

fn default_transport_kind() -> String {
    "ipc".into()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
        }
    }
}

impl ComputerConfig {
    /// Resolve the thread count (0 means use available parallelism).
    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.threads
        }
    }
}
