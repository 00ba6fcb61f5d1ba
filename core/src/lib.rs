pub mod context;
pub mod timers;

// Re-exports for convenience
pub use context::{ConfigError, ServerConfig, ServerConfigExt};
pub use timers::{
    Clock, IdleTimeouts, ManualClock, MAX_IDLE_TIMEOUT, SystemClock, Timer, TimerId, TimerList,
};
