use std::time::{Duration, Instant};

/// Identifies a scheduled timer, returned by [`TimerQueue::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Entry<K> {
    handle: TimerHandle,
    deadline: Instant,
    kind: K,
}

/// One-shot timers driven by an externally supplied clock.
///
/// Nothing fires on its own, the owner calls [`TimerQueue::pop_due`] from its event loop.
pub struct TimerQueue<K> {
    entries: Vec<Entry<K>>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` to fire once `delay` has elapsed from `now`
    pub fn schedule(&mut self, now: Instant, delay: Duration, kind: K) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;

        let deadline = saturating_deadline(now, delay);
        self.entries.push(Entry { handle, deadline, kind });
        return handle;
    }

    /// Cancels a pending timer, returns false if it already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        return self.entries.len() != before;
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns the earliest timer whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerHandle, K)> {
        let index = self.entries.iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline <= now)
            .min_by_key(|(_, entry)| (entry.deadline, entry.handle.0))
            .map(|(index, _)| index)?;

        let entry = self.entries.remove(index);
        return Some((entry.handle, entry.kind));
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        return self.entries.iter().any(|entry| entry.handle == handle);
    }

    pub fn deadline(&self, handle: TimerHandle) -> Option<Instant> {
        return self.entries.iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.deadline);
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }
}

/// `now + delay`, or the furthest representable instant when that overflows
fn saturating_deadline(now: Instant, delay: Duration) -> Instant {
    let mut delay = delay;
    loop {
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }
        delay /= 2;
    }
}
