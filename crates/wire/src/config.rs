//! Deployment configuration: where the Space listens, how workers reach it,
//! and the timeouts applied to remote calls.
//!
//! Parsed from `fanout.toml`, then overridden from `FANOUT_*` environment
//! variables, then validated.

mod helpers;
mod loading;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use types::{ComputerConfig, FanoutConfig, SpaceConfig, TransportConfig};
