#![forbid(unsafe_code)]

//! Host-advanced clock and one-shot timers (`setTimeout` / `clearTimeout`).
//!
//! Time only moves when the host calls [`TimerQueue::pop_due`] with a later
//! deadline, which keeps every gesture replay deterministic.

use core::time::Duration;

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time. Time never moves backwards.
    pub fn set(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

/// Handle for cancelling a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Timer {
    id: TimerId,
    due: Duration,
    callback: Box<dyn FnOnce()>,
}

/// Pending one-shot timers ordered by due time, then scheduling order.
#[derive(Default)]
pub struct TimerQueue {
    clock: DeterministicClock,
    pending: Vec<Timer>,
    next_id: u64,
}

impl core::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.clock.now())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Number of timers that have neither fired nor been cleared.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Schedule `callback` to run `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let due = self.clock.now().saturating_add(delay);
        let at = self
            .pending
            .partition_point(|timer| (timer.due, timer.id) <= (due, id));
        self.pending.insert(at, Timer { id, due, callback });
        id
    }

    /// Cancel a pending timer. Returns whether it was still pending.
    pub fn clear(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.id != id);
        self.pending.len() != before
    }

    /// Remove the earliest timer due at or before `deadline`, moving the
    /// clock to its due time.
    ///
    /// Callers run the returned callback without holding the queue, so the
    /// callback may schedule or clear timers itself.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<Box<dyn FnOnce()>> {
        let first = self.pending.first()?;
        if first.due > deadline {
            return None;
        }
        let timer = self.pending.remove(0);
        self.clock.set(timer.due);
        Some(timer.callback)
    }

    /// Move the clock to `deadline` once no due timers remain.
    pub fn settle_at(&mut self, deadline: Duration) {
        self.clock.set(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn drain(queue: &mut TimerQueue, deadline: Duration) {
        while let Some(callback) = queue.pop_due(deadline) {
            callback();
        }
        queue.settle_at(deadline);
    }

    #[test]
    fn timers_fire_in_due_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = TimerQueue::new();
        for (label, ms) in [("late", 30), ("early", 10), ("tie", 10)] {
            let log = Rc::clone(&log);
            queue.schedule(
                Duration::from_millis(ms),
                Box::new(move || log.borrow_mut().push(label)),
            );
        }
        drain(&mut queue, Duration::from_millis(20));
        assert_eq!(*log.borrow(), vec!["early", "tie"]);
        assert_eq!(queue.now(), Duration::from_millis(20));
        drain(&mut queue, Duration::from_millis(30));
        assert_eq!(*log.borrow(), vec!["early", "tie", "late"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let fired = Rc::new(RefCell::new(false));
        let mut queue = TimerQueue::new();
        let flag = Rc::clone(&fired);
        let id = queue.schedule(
            Duration::from_millis(5),
            Box::new(move || *flag.borrow_mut() = true),
        );
        assert!(queue.clear(id));
        assert!(!queue.clear(id));
        drain(&mut queue, Duration::from_secs(1));
        assert!(!*fired.borrow());
    }

    #[test]
    fn clock_is_monotonic() {
        let mut clock = DeterministicClock::new();
        clock.advance(Duration::from_millis(10));
        clock.set(Duration::from_millis(3));
        assert_eq!(clock.now(), Duration::from_millis(10));
    }
}
