//! Idle-timeout driver polled by the host I/O loop
//!
//! Wraps a [`TimerList`] with a clock and a fixed idle timeout. Instead of
//! an asynchronous alarm, the loop asks [`IdleTimeouts::poll_timeout`] how
//! long it may block waiting for I/O, then calls [`IdleTimeouts::tick`] once
//! that wait has elapsed. Callbacks therefore always run on the loop itself.

use std::time::{Duration, Instant};

use idlereap_types::MAX_IDLE_TIMEOUT_SECS;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::list::TimerList;
use super::timer::{Timer, TimerId};

/// Per-connection idle timers sharing one timeout
pub struct IdleTimeouts<C, K = SystemClock> {
    timers: TimerList<C, Instant>,
    clock: K,
    idle_timeout: Duration,
    max_wait: Option<Duration>,
}

/// Idle timeouts longer than this are clamped so deadlines stay representable
pub const MAX_IDLE_TIMEOUT: Duration = Duration::from_secs(MAX_IDLE_TIMEOUT_SECS);

impl<C, K: Clock> IdleTimeouts<C, K> {
    pub fn new(clock: K, idle_timeout: Duration) -> Self {
        if idle_timeout > MAX_IDLE_TIMEOUT {
            warn!(
                requested = ?idle_timeout,
                clamped = ?MAX_IDLE_TIMEOUT,
                "idle timeout too long, clamping"
            );
        }
        Self {
            timers: TimerList::new(),
            clock,
            idle_timeout: idle_timeout.min(MAX_IDLE_TIMEOUT),
            max_wait: None,
        }
    }

    /// Never sleep longer than `max_wait` between sweeps, even with no timers
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Start an idle timer expiring one idle timeout from now
    pub fn register<F>(&mut self, context: C, on_expire: F) -> TimerId
    where
        F: FnOnce(&mut TimerList<C, Instant>, C) + 'static,
    {
        let deadline = self.expiry();
        self.timers.add(Timer::new(deadline, context, on_expire))
    }

    /// Record activity: push the deadline back to one idle timeout from now
    pub fn touch(&mut self, id: impl Into<Option<TimerId>>) {
        let deadline = self.expiry();
        self.timers.extend(id, deadline);
    }

    /// One idle timeout from now. A deadline past the end of `Instant`'s range
    /// expires on the next tick instead of panicking.
    fn expiry(&self) -> Instant {
        let now = self.clock.now();
        now.checked_add(self.idle_timeout).unwrap_or(now)
    }

    /// Drop a timer without firing it
    pub fn cancel(&mut self, id: impl Into<Option<TimerId>>) -> Option<C> {
        self.timers.remove(id)
    }

    /// How long the loop may wait before the next `tick`.
    ///
    /// Zero when the head has already expired. `None` only when there are no
    /// timers and no wait cap, meaning the loop may block on I/O alone.
    pub fn poll_timeout(&self) -> Option<Duration> {
        let until_next = self
            .timers
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()));

        match (until_next, self.max_wait) {
            (Some(wait), Some(cap)) => Some(wait.min(cap)),
            (wait, cap) => wait.or(cap),
        }
    }

    /// Fire every timer whose deadline has passed
    pub fn tick(&mut self) -> usize {
        let fired = self.timers.sweep(self.clock.now());
        if fired > 0 {
            debug!(fired, remaining = self.timers.len(), "idle sweep");
        }
        fired
    }
}
