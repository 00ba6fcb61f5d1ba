//! Timer records and handles
//!
//! A `Timer` is a single scheduled expiration: an absolute deadline, a
//! one-shot callback, and a caller-owned context handed to that callback.
//! Once added to a [`TimerList`] it is addressed through a [`TimerId`].

use std::fmt;
use std::time::Instant;

use super::list::TimerList;

/// Callback run when a timer expires.
///
/// Receives the list (so it may add, extend or remove other timers) and the
/// context the timer was created with. By the time it runs, its own timer has
/// already been destroyed.
pub type Callback<C, D> = Box<dyn FnOnce(&mut TimerList<C, D>, C)>;

/// A scheduled expiration not yet attached to a list.
pub struct Timer<C, D = Instant> {
    /// Absolute expiration time
    pub deadline: D,

    /// Caller-owned context passed to the callback.
    ///
    /// The list only ever drops this value, so a `Weak` or a plain key keeps
    /// the real connection state out of the list's ownership.
    pub context: C,

    pub(crate) callback: Callback<C, D>,
}

impl<C, D> Timer<C, D> {
    pub fn new<F>(deadline: D, context: C, callback: F) -> Self
    where
        F: FnOnce(&mut TimerList<C, D>, C) + 'static,
    {
        Self {
            deadline,
            context,
            callback: Box::new(callback),
        }
    }
}

impl<C: fmt::Debug, D: fmt::Debug> fmt::Debug for Timer<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("deadline", &self.deadline)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Handle to a timer inside a [`TimerList`].
///
/// Identity is the handle, not the deadline: two timers may share a deadline.
/// After the timer is removed or fired the handle goes stale, and every list
/// operation treats a stale handle as absent.
///
/// Staleness is tracked with a per-slot `u32` generation. A slot is retired
/// once its generation is used up, so a stale handle never matches again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
