//! The event pump's timer heap (§4.J): a min-heap of scheduled
//! deadlines, polled once per pump iteration alongside the I/O
//! multiplexer (which in this reimplementation is tokio's own reactor —
//! see [`crate::factory`] module docs).

use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

struct Entry {
    deadline: Instant,
    id: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline.cmp(&other.deadline)
    }
}

/// A min-heap of scheduled deadlines. The event pump asks it for the
/// time until the next deadline (bounding its own sleep) and for the set
/// of deadlines that have already elapsed.
#[derive(Default)]
pub struct TimerHeap {
    entries: Mutex<BinaryHeap<Reverse<Entry>>>,
    next_id: Mutex<u64>,
}

impl TimerHeap {
    /// An empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a deadline, returning an id that [`TimerHeap::cancel`]
    /// can later use to remove it before it fires.
    pub fn schedule(&self, deadline: Instant) -> u64 {
        let mut next_id = self.next_id.lock();
        let id = *next_id;
        *next_id += 1;
        self.entries.lock().push(Reverse(Entry { deadline, id }));
        id
    }

    /// Remove every pending deadline with this id. A no-op if it already
    /// fired or was never scheduled.
    pub fn cancel(&self, id: u64) {
        let mut entries = self.entries.lock();
        entries.retain(|Reverse(e)| e.id != id);
    }

    /// How long until the next deadline, capped at `cap`. `None` if the
    /// heap is empty (the caller should wait up to `cap` regardless).
    pub fn time_until_next(&self, now: Instant, cap: std::time::Duration) -> std::time::Duration {
        match self.entries.lock().peek() {
            Some(Reverse(entry)) => entry.deadline.saturating_duration_since(now).min(cap),
            None => cap,
        }
    }

    /// Pop and return the ids of every deadline at or before `now`.
    pub fn drain_expired(&self, now: Instant) -> Vec<u64> {
        let mut entries = self.entries.lock();
        let mut fired = Vec::new();
        while let Some(Reverse(entry)) = entries.peek() {
            if entry.deadline <= now {
                let Reverse(entry) = entries.pop().unwrap();
                fired.push(entry.id);
            } else {
                break;
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn expired_deadlines_drain_in_order() {
        let heap = TimerHeap::new();
        let now = Instant::now();
        let a = heap.schedule(now);
        let b = heap.schedule(now + Duration::from_millis(1));
        heap.schedule(now + Duration::from_secs(10));

        let fired = heap.drain_expired(now + Duration::from_millis(5));
        assert_eq!(fired, vec![a, b]);
    }

    #[test]
    fn cancel_removes_before_it_fires() {
        let heap = TimerHeap::new();
        let now = Instant::now();
        let id = heap.schedule(now);
        heap.cancel(id);
        assert!(heap.drain_expired(now).is_empty());
    }

    #[test]
    fn time_until_next_is_capped() {
        let heap = TimerHeap::new();
        let now = Instant::now();
        heap.schedule(now + Duration::from_secs(5));
        let wait = heap.time_until_next(now, Duration::from_millis(999));
        assert_eq!(wait, Duration::from_millis(999));
    }
}
