//! Tuning settings for a breaker instance.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Circuit tuning parameters.
///
/// Immutable once an engine is constructed; callers own one settings
/// value per guarded dependency. There is no runtime mutation and no
/// global registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSettings {
    /// Minimum number of requests in the rolling window before the
    /// circuit can trip due to health.
    #[serde(rename = "request_volume_threshold")]
    pub request_count_threshold: u64,

    /// How long the circuit stays open before admitting a recovery
    /// probe (in seconds)
    #[serde(with = "duration_secs")]
    pub sleep_window: Duration,

    /// Rolling error percentage at or above which the circuit trips
    /// (0-100).
    pub error_percent_threshold: u8,

    /// Length of the rolling window over which request and error
    /// counters accumulate (in seconds)
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            request_count_threshold: 20,
            sleep_window: Duration::from_secs(5),
            error_percent_threshold: 50,
            interval: Duration::from_secs(10),
        }
    }
}

/// Invalid tuning values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("request volume threshold must be at least 1")]
    ZeroRequestThreshold,

    #[error("error percent threshold must be between 0 and 100, got {0}")]
    ErrorPercentOutOfRange(u8),
}

impl CircuitSettings {
    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.request_count_threshold == 0 {
            return Err(SettingsError::ZeroRequestThreshold);
        }
        if self.error_percent_threshold > 100 {
            return Err(SettingsError::ErrorPercentOutOfRange(
                self.error_percent_threshold,
            ));
        }
        Ok(())
    }
}
