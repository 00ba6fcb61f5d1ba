//! Shared configuration types for idlereap
//!
//! This crate contains the serializable configuration shared between the
//! timer core (idlereap-core), which persists it, and the server binary
//! (idlereap-cli), which applies it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Server Config
// ─────────────────────────────────────────────────────────────────────────────

/// Base sweep period in seconds. Idle connections expire after three of these.
pub const TIMESLOT_SECS: u64 = 5;

/// Longest accepted idle timeout (one week).
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

fn default_bind_addr() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    3 * TIMESLOT_SECS
}

fn default_max_wait_ms() -> u64 {
    TIMESLOT_SECS * 1000
}

fn default_max_connections() -> usize {
    5
}

fn default_read_buffer_size() -> usize {
    64
}

/// Configuration for the idle-reaping server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the listener binds to (e.g. "127.0.0.1:7878")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Seconds without activity before a connection is closed
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Upper bound on how long the loop sleeps between sweeps.
    /// 0 disables the cap (sleep exactly until the next deadline).
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    /// Connections beyond this are told "too many users" and dropped
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Size of the per-connection read buffer in bytes
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            idle_timeout_secs: default_idle_timeout_secs(),
            max_wait_ms: default_max_wait_ms(),
            max_connections: default_max_connections(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl ServerConfig {
    /// Idle timeout as a `Duration`
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Sweep wait cap, or `None` when uncapped
    pub fn max_wait(&self) -> Option<Duration> {
        (self.max_wait_ms > 0).then(|| Duration::from_millis(self.max_wait_ms))
    }
}
