//! Simulated time and repeating timers.
//!
//! The clock never reads the wall clock. The host advances it explicitly through
//! [`crate::Root::advance`], which makes every timing behavior of the tree
//! reproducible in tests.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Timer {
    id: TimerId,
    due: Duration,
    interval: Duration,
}

#[derive(Debug, Default)]
pub struct Clock {
    now: Duration,
    timers: Vec<Timer>,
    next_id: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the clock was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Registers a timer firing every `interval`, first at `now + interval`.
    ///
    /// A zero interval would fire forever within one advance, so it is bumped to
    /// the smallest representable step.
    pub fn add_timer(&mut self, interval: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let interval = interval.max(Duration::from_nanos(1));
        self.timers.push(Timer {
            id,
            due: self.now + interval,
            interval,
        });
        id
    }

    /// Cancels a timer. Cancelling an unknown or already cancelled timer is a no-op.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        before != self.timers.len()
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.iter().any(|timer| timer.id == id)
    }

    pub fn num_timers(&self) -> usize {
        self.timers.len()
    }

    /// Takes the earliest timer due at or before `until`, moves the clock to its
    /// due time and schedules its next firing. Ties go to the older timer.
    pub(crate) fn pop_due(&mut self, until: Duration) -> Option<TimerId> {
        let timer = self
            .timers
            .iter_mut()
            .filter(|timer| timer.due <= until)
            .min_by_key(|timer| (timer.due, timer.id))?;
        self.now = self.now.max(timer.due);
        timer.due += timer.interval;
        Some(timer.id)
    }

    pub(crate) fn clear_timers(&mut self) {
        self.timers.clear();
    }

    /// Moves time forward without firing anything. Time never goes backwards.
    pub(crate) fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_timer_order() {
        let mut clock = Clock::new();
        let slow = clock.add_timer(Duration::from_millis(300));
        let fast = clock.add_timer(Duration::from_millis(200));

        let until = Duration::from_millis(600);
        let mut fired = vec![];
        while let Some(id) = clock.pop_due(until) {
            fired.push((id, clock.now().as_millis()));
        }
        assert_eq!(
            fired,
            vec![(fast, 200), (slow, 300), (fast, 400), (slow, 600), (fast, 600)]
        );
    }

    #[test]
    fn test_cancel() {
        let mut clock = Clock::new();
        let id = clock.add_timer(Duration::from_millis(100));
        assert!(clock.is_scheduled(id));
        assert!(clock.cancel(id));
        assert!(!clock.cancel(id));
        assert_eq!(clock.pop_due(Duration::from_secs(1)), None);
        assert_eq!(clock.num_timers(), 0);
    }

    #[test]
    fn test_set_now_is_monotonic() {
        let mut clock = Clock::new();
        clock.set_now(Duration::from_secs(2));
        clock.set_now(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }
}
