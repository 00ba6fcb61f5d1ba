mod config;
mod error;

pub use config::{MAX_IDLE_TIMEOUT_SECS, ServerConfig, ServerConfigExt, TIMESLOT_SECS};
pub use error::ConfigError;
