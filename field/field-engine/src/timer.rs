//! Disable-then-rearm one-shot timers.
//!
//! Each rebuild pipeline is paced by a timer that fires once, stays
//! disarmed while the build is in flight, and is rearmed by the build's
//! completion with `max(1ms, period − elapsed)`. At most one build per
//! tree can therefore ever be outstanding, enforced by timer semantics
//! rather than locks; the cadence stretches automatically when builds run
//! longer than the configured period.

use std::time::{Duration, Instant};

/// Floor for rearm delays, so a slow build still yields the thread between
/// cycles instead of rescheduling itself immediately.
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Computes the delay until the next rebuild: the configured period minus
/// the time the last build took, floored at [`MIN_DELAY`].
#[must_use]
pub fn next_delay(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed).max(MIN_DELAY)
}

/// A one-shot timer that disarms when it fires and stays disarmed until
/// explicitly rearmed.
#[derive(Debug, Clone, Copy)]
pub struct RearmTimer {
    deadline: Option<Instant>,
}

impl RearmTimer {
    /// A timer that will not fire until rearmed.
    #[must_use]
    pub fn disarmed() -> Self {
        Self { deadline: None }
    }

    /// A timer due after `delay`.
    #[must_use]
    pub fn armed_in(delay: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + delay),
        }
    }

    /// Arms (or re-arms) the timer to fire after `delay`.
    pub fn rearm(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    /// Makes the timer due immediately.
    pub fn fire_now(&mut self) {
        self.deadline = Some(Instant::now());
    }

    /// Whether the timer currently has a deadline.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fires the timer if its deadline has passed, disarming it.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay_subtracts_elapsed() {
        let delay = next_delay(Duration::from_millis(100), Duration::from_millis(30));
        assert_eq!(delay, Duration::from_millis(70));
    }

    #[test]
    fn test_next_delay_floors_at_one_millisecond() {
        // Build slower than the period: cadence stretches, never goes to zero.
        let delay = next_delay(Duration::from_millis(100), Duration::from_millis(250));
        assert_eq!(delay, MIN_DELAY);
    }

    #[test]
    fn test_fire_disarms_until_rearmed() {
        let mut timer = RearmTimer::armed_in(Duration::ZERO);
        let now = Instant::now();
        assert!(timer.fire_if_due(now));
        assert!(!timer.is_armed());
        assert!(!timer.fire_if_due(now));

        timer.rearm(Duration::ZERO);
        assert!(timer.fire_if_due(Instant::now()));
    }

    #[test]
    fn test_disarmed_never_fires() {
        let mut timer = RearmTimer::disarmed();
        assert!(!timer.fire_if_due(Instant::now()));
    }

    #[test]
    fn test_future_deadline_not_due_yet() {
        let mut timer = RearmTimer::armed_in(Duration::from_secs(3600));
        assert!(!timer.fire_if_due(Instant::now()));
        assert!(timer.is_armed());
    }
}
