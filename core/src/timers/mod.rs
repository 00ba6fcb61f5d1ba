//! Timer system
//!
//! This module provides:
//! - **Timers**: one-shot expiration records with a callback and context
//! - **List**: an ascending doubly linked list owning those records
//! - **Scheduler**: idle-timeout driver the I/O loop polls for its wait time
//!
//! # Lifecycle
//!
//! ```text
//!   Timer::new ──add──▶ in list ──extend──▶ in list (moved later)
//!                          │
//!              remove / sweep (fires callback)
//!                          ▼
//!                      destroyed (TimerId is stale)
//! ```

mod clock;
mod list;
mod scheduler;
mod timer;


pub use clock::{Clock, ManualClock, SystemClock};
pub use list::{Iter, TimerList};
pub use scheduler::{IdleTimeouts, MAX_IDLE_TIMEOUT};
pub use timer::{Callback, Timer, TimerId};
