//! Duration type for batcher configuration.
//!
//! Configuration values such as the quiescence interval and dispatch timeout are
//! whole seconds, so they serialize as plain integers in checkpoint and config
//! JSON.

use serde::{Deserialize, Serialize};

use crate::error::BatcherError;

/// Duration type representing a time interval in seconds.
///
/// # Example
///
/// ```
/// use durable_batcher::Duration;
///
/// let five_seconds = Duration::from_seconds(5);
/// let five_minutes = Duration::from_minutes(5);
///
/// assert_eq!(five_seconds.to_seconds(), 5);
/// assert_eq!(five_minutes.to_seconds(), 300);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Duration {
    seconds: u64,
}

impl Duration {
    /// Creates a new Duration from the given number of seconds.
    pub fn from_seconds(seconds: u64) -> Self {
        Self { seconds }
    }

    /// Creates a new Duration from the given number of minutes.
    pub fn from_minutes(minutes: u64) -> Self {
        Self {
            seconds: minutes.saturating_mul(60),
        }
    }

    /// Returns the total number of seconds in this duration.
    pub fn to_seconds(&self) -> u64 {
        self.seconds
    }

    /// Returns true if this duration is zero seconds long.
    pub fn is_zero(&self) -> bool {
        self.seconds == 0
    }

    /// Validates that this duration is at least one second.
    ///
    /// `field` names the configuration value in the error message.
    ///
    /// ```
    /// use durable_batcher::Duration;
    ///
    /// assert!(Duration::from_seconds(1).validate_positive("quiescence_interval").is_ok());
    /// assert!(Duration::from_seconds(0).validate_positive("quiescence_interval").is_err());
    /// ```
    pub fn validate_positive(&self, field: &str) -> Result<(), BatcherError> {
        if self.is_zero() {
            return Err(BatcherError::validation(format!(
                "{} must be at least 1 second, got {} seconds",
                field, self.seconds
            )));
        }
        Ok(())
    }
}

impl From<std::time::Duration> for Duration {
    fn from(duration: std::time::Duration) -> Self {
        Self {
            seconds: duration.as_secs(),
        }
    }
}

impl From<Duration> for std::time::Duration {
    fn from(duration: Duration) -> Self {
        std::time::Duration::from_secs(duration.seconds)
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.seconds)
    }
}
