//! The deadline timer.
//!
//! A single outstanding alarm. Arming replaces any previous alarm, and a fired
//! alarm disarms itself, so at most one deadline event exists at a time.

use chrono::{DateTime, Utc};
use tokio::time::{sleep_until, Instant};

/// Stand-in deadline for intervals too long to add to the clock.
fn far_future() -> Instant {
    // Roughly 30 years from now.
    Instant::now() + std::time::Duration::from_secs(86400 * 365 * 30)
}

/// One-shot wall-clock alarm owned by an accumulator instance.
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    deadline: Option<Instant>,
    armed_at: Option<DateTime<Utc>>,
}

impl DeadlineTimer {
    /// Creates a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the alarm `duration` from now, replacing any pending alarm.
    ///
    /// An interval that overflows the clock is clamped to a far-future
    /// deadline, so an absurd quiescence setting waits instead of panicking.
    pub fn arm(&mut self, duration: std::time::Duration) {
        let deadline = Instant::now().checked_add(duration).unwrap_or_else(far_future);
        self.deadline = Some(deadline);
        self.armed_at = Some(Utc::now());
        tracing::trace!(duration_secs = duration.as_secs(), "Deadline timer armed");
    }

    /// Cancels the pending alarm. No effect when nothing is pending.
    pub fn disarm(&mut self) {
        self.deadline = None;
        self.armed_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wall-clock time the current alarm was armed, if any.
    pub fn armed_at(&self) -> Option<DateTime<Utc>> {
        self.armed_at
    }

    /// Completes when the armed deadline passes, then disarms the timer.
    ///
    /// Never completes while disarmed. Cancel safe: dropping the future
    /// before it completes leaves the alarm armed.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.disarm();
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_duration_and_disarms() {
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_secs(300));
        assert!(timer.is_armed());
        assert!(timer.armed_at().is_some());

        let start = Instant::now();
        timer.fired().await;
        assert!(start.elapsed() >= Duration::from_secs(300));
        assert!(!timer.is_armed());
        assert!(timer.armed_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_alarm() {
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(5)).await;
        timer.arm(Duration::from_secs(10));

        let start = Instant::now();
        timer.fired().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_secs(1));
        timer.disarm();
        timer.disarm();

        let result = tokio::time::timeout(Duration::from_secs(3600), timer.fired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflowing_interval_is_clamped() {
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_secs(u64::MAX));
        assert!(timer.is_armed());

        let result = tokio::time::timeout(Duration::from_secs(86400 * 365), timer.fired()).await;
        assert!(result.is_err());
        assert!(timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_alarm_armed() {
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_secs(10));

        let early = tokio::time::timeout(Duration::from_secs(2), timer.fired()).await;
        assert!(early.is_err());
        assert!(timer.is_armed());

        timer.fired().await;
        assert!(!timer.is_armed());
    }
}
