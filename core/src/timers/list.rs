//! Ascending doubly linked timer list
//!
//! Nodes live in an arena (`Vec` of slots) and link to each other by index.
//! Each slot carries a generation that is bumped whenever its node is
//! destroyed, so a [`TimerId`] issued for an earlier occupant can never
//! reach the new one. A slot that runs out of generations is retired rather
//! than reused.
//!
//! # Invariants
//!
//! - Walking `head` to `tail` yields non-decreasing deadlines.
//! - `head.prev` and `tail.next` are empty; `a.next == b` iff `b.prev == a`.
//! - Every linked node is owned by the list. Dropping a node drops its
//!   context handle and nothing else.

use std::fmt;
use std::time::Instant;

use tracing::{trace, warn};

use super::timer::{Callback, Timer, TimerId};

struct Node<C, D> {
    deadline: D,
    context: C,
    callback: Callback<C, D>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Slot<C, D> {
    generation: u32,
    node: Option<Node<C, D>>,
}

/// Sorted list of timers, soonest deadline first.
pub struct TimerList<C, D = Instant> {
    slots: Vec<Slot<C, D>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<C, D> Default for TimerList<C, D> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }
}

impl<C, D: Ord + Copy> TimerList<C, D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Whether `id` still names a timer in this list
    pub fn contains(&self, id: TimerId) -> bool {
        self.resolve(id).is_some()
    }

    /// Current deadline of a live timer
    pub fn deadline(&self, id: TimerId) -> Option<D> {
        self.resolve(id).map(|idx| self.node(idx).deadline)
    }

    /// Deadline of the head, i.e. the next timer to expire
    pub fn next_deadline(&self) -> Option<D> {
        self.head.map(|idx| self.node(idx).deadline)
    }

    /// Iterate `(id, deadline)` pairs from head to tail
    pub fn iter(&self) -> Iter<'_, C, D> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Insert a timer at its sorted position.
    ///
    /// A timer earlier than the head becomes the head in O(1). Otherwise the
    /// scan starts at the head and the timer lands after every timer with an
    /// equal deadline, so equal deadlines fire in arrival order.
    pub fn add(&mut self, timer: Timer<C, D>) -> TimerId {
        let Timer {
            deadline,
            context,
            callback,
        } = timer;
        let idx = self.alloc(Node {
            deadline,
            context,
            callback,
            prev: None,
            next: None,
        });

        match self.head {
            None => {
                self.head = Some(idx);
                self.tail = Some(idx);
            }
            Some(head) if deadline < self.node(head).deadline => {
                self.node_mut(idx).next = Some(head);
                self.node_mut(head).prev = Some(idx);
                self.head = Some(idx);
            }
            Some(head) => self.insert_from(idx, head),
        }

        let id = self.id_at(idx);
        trace!(timer = %id, len = self.len, "timer added");
        id
    }

    /// Move a timer later after its deadline grew to `deadline`.
    ///
    /// Deadlines may only increase through this call; a smaller deadline is
    /// rejected and leaves the list untouched (use `remove` + `add` instead).
    /// Absent or stale handles are ignored.
    pub fn extend(&mut self, id: impl Into<Option<TimerId>>, deadline: D) {
        let Some(idx) = id.into().and_then(|id| self.resolve(id)) else {
            return;
        };

        if deadline < self.node(idx).deadline {
            warn!(timer = %self.id_at(idx), "refusing to move timer deadline earlier");
            return;
        }
        let node = self.node_mut(idx);
        node.deadline = deadline;

        // Tail, or still ahead of its successor: already in place
        let Some(next) = node.next else {
            return;
        };
        if deadline <= self.node(next).deadline {
            return;
        }

        // The new position can only be past the old successor, so the scan
        // resumes there instead of at the head.
        self.unlink(idx);
        self.insert_from(idx, next);
    }

    /// Detach and destroy a timer, handing back its context.
    ///
    /// Absent or stale handles are ignored and return `None`.
    pub fn remove(&mut self, id: impl Into<Option<TimerId>>) -> Option<C> {
        let id = id.into()?;
        let idx = self.resolve(id)?;
        self.unlink(idx);
        let node = self.release(idx);
        trace!(timer = %id, len = self.len, "timer removed");
        Some(node.context)
    }

    /// Fire every timer with `deadline <= now`, soonest first.
    ///
    /// Each expired head is unlinked and destroyed before its callback runs.
    /// Callbacks may add, extend or remove other timers; the head is re-read
    /// after every callback, so those changes are honoured. A callback that
    /// adds an already-expired timer will see it fire in this same sweep.
    ///
    /// Returns the number of callbacks invoked.
    pub fn sweep(&mut self, now: D) -> usize {
        let mut fired = 0;

        while let Some(head) = self.head {
            if now < self.node(head).deadline {
                break;
            }
            self.unlink(head);
            let Node {
                context, callback, ..
            } = self.release(head);
            callback(self, context);
            fired += 1;
        }

        fired
    }

    /// Destroy every timer without firing any callback
    pub fn clear(&mut self) {
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            cursor = self.node(idx).next;
            self.release(idx);
        }
        self.head = None;
        self.tail = None;
    }

    // ─── Linking ────────────────────────────────────────────────────────────

    /// Splice `idx` after `anchor`, before the first node strictly later than it.
    /// `anchor` must be linked and no later than `idx`.
    fn insert_from(&mut self, idx: usize, anchor: usize) {
        let deadline = self.node(idx).deadline;
        let mut prev = anchor;
        let mut cursor = self.node(anchor).next;

        while let Some(cur) = cursor {
            if deadline < self.node(cur).deadline {
                break;
            }
            prev = cur;
            cursor = self.node(cur).next;
        }

        self.node_mut(prev).next = Some(idx);
        match cursor {
            Some(cur) => self.node_mut(cur).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        let node = self.node_mut(idx);
        node.prev = Some(prev);
        node.next = cursor;
    }

    fn unlink(&mut self, idx: usize) {
        let node = self.node(idx);
        let (prev, next) = (node.prev, node.next);

        match (prev, next) {
            // Sole element
            (None, None) => {
                self.head = None;
                self.tail = None;
            }
            // Head
            (None, Some(next)) => {
                self.head = Some(next);
                self.node_mut(next).prev = None;
            }
            // Tail
            (Some(prev), None) => {
                self.tail = Some(prev);
                self.node_mut(prev).next = None;
            }
            (Some(prev), Some(next)) => {
                self.node_mut(prev).next = Some(next);
                self.node_mut(next).prev = Some(prev);
            }
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }
}

impl<C, D> TimerList<C, D> {
    // ─── Arena ──────────────────────────────────────────────────────────────

    fn alloc(&mut self, node: Node<C, D>) -> usize {
        self.len += 1;
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx].node = Some(node);
                idx
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    /// Take the node out of its slot and bump the slot's generation.
    /// A slot whose generation would wrap is never handed out again, so an
    /// old handle can't come back to life.
    fn release(&mut self, idx: usize) -> Node<C, D> {
        let slot = &mut self.slots[idx];
        let node = slot.node.take().expect("released slot must be occupied");
        match slot.generation.checked_add(1) {
            Some(generation) => {
                slot.generation = generation;
                self.free.push(idx);
            }
            None => trace!(slot = idx, "slot generation exhausted, retiring"),
        }
        self.len -= 1;
        node
    }

    fn resolve(&self, id: TimerId) -> Option<usize> {
        let slot = self.slots.get(id.index)?;
        (slot.generation == id.generation && slot.node.is_some()).then_some(id.index)
    }

    fn id_at(&self, idx: usize) -> TimerId {
        TimerId {
            index: idx,
            generation: self.slots[idx].generation,
        }
    }

    fn node(&self, idx: usize) -> &Node<C, D> {
        self.slots[idx]
            .node
            .as_ref()
            .expect("linked slot must be occupied")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<C, D> {
        self.slots[idx]
            .node
            .as_mut()
            .expect("linked slot must be occupied")
    }
}

impl<C, D: fmt::Debug> fmt::Debug for TimerList<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx);
            list.entry(&node.deadline);
            cursor = node.next;
        }
        list.finish()
    }
}

/// Iterator over `(id, deadline)` in list order
pub struct Iter<'a, C, D> {
    list: &'a TimerList<C, D>,
    cursor: Option<usize>,
}

impl<C, D: Copy> Iterator for Iter<'_, C, D> {
    type Item = (TimerId, D);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.list.node(idx);
        self.cursor = node.next;
        Some((self.list.id_at(idx), node.deadline))
    }
}

#[cfg(test)]
impl<C, D: Ord + Copy + fmt::Debug> TimerList<C, D> {
    /// Walk both directions and check ordering and link symmetry
    pub(crate) fn assert_invariants(&self) {
        let mut count = 0;
        let mut prev: Option<usize> = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx);
            assert_eq!(node.prev, prev, "prev link broken at slot {idx}");
            if let Some(p) = prev {
                assert!(
                    self.node(p).deadline <= node.deadline,
                    "list out of order: {self:?}"
                );
            }
            prev = Some(idx);
            cursor = node.next;
            count += 1;
        }
        assert_eq!(self.tail, prev, "tail does not match last node");
        assert_eq!(count, self.len, "len does not match linked nodes");
        if self.head.is_none() {
            assert!(self.tail.is_none());
        }
    }
}
