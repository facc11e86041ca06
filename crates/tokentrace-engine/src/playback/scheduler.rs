use std::collections::BTreeMap;
use std::time::Duration;

/// Identifies one scheduled single-shot timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

/// Single-shot timer source.
///
/// A timer's action is delivering its handle back to the owner (for playback,
/// `PlaybackEngine::fire`). Cancelling guarantees the handle is never
/// delivered by this scheduler.
pub trait Scheduler {
    fn schedule_once(&mut self, delay: Duration) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

/// Deterministic scheduler driven by a virtual clock.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerHandle, Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.values().min().copied()
    }

    /// Delay until the given timer fires, if it is pending
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.pending
            .get(&handle)
            .map(|due| due.saturating_sub(self.now))
    }

    /// Move the clock forward and return the timers that fell due, in due order
    pub fn advance(&mut self, by: Duration) -> Vec<TimerHandle> {
        self.now += by;
        let mut due: Vec<(Duration, TimerHandle)> = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= self.now)
            .map(|(handle, at)| (*at, *handle))
            .collect();
        due.sort();

        for (_, handle) in &due {
            self.pending.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.insert(handle, self.now + delay);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_returns_due_timers_in_order() {
        let mut scheduler = ManualScheduler::new();
        let late = scheduler.schedule_once(Duration::from_millis(300));
        let early = scheduler.schedule_once(Duration::from_millis(100));

        assert!(scheduler.advance(Duration::from_millis(50)).is_empty());
        assert_eq!(scheduler.advance(Duration::from_millis(300)), vec![early, late]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_once(Duration::from_millis(100));
        scheduler.cancel(handle);

        assert!(scheduler.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_remaining() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_once(Duration::from_millis(400));
        scheduler.advance(Duration::from_millis(150));
        assert_eq!(scheduler.remaining(handle), Some(Duration::from_millis(250)));
    }
}
