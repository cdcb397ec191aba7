//! Trip decision over rolling-window counts.

use crate::config::CircuitSettings;

/// Rolling error percentage for a failure that is being handled but not
/// yet durably recorded.
///
/// The in-flight failure counts toward the numerator, so the ratio is
/// `(error_count + 1) * 100 / request_count` in integer arithmetic.
/// `request_count` is the post-increment window count and is at least 1
/// on every live call path; a zero count is clamped regardless.
pub fn error_percent(error_count: u64, request_count: u64) -> u64 {
    (error_count + 1) * 100 / request_count.max(1)
}

/// Whether a failure observed at these window counts trips the circuit.
///
/// Both gates must hold: the window has seen enough requests to be
/// meaningful, and the error ratio is at or above the configured
/// percentage.
pub fn should_trip(request_count: u64, error_count: u64, settings: &CircuitSettings) -> bool {
    request_count >= settings.request_count_threshold
        && error_percent(error_count, request_count) >= u64::from(settings.error_percent_threshold)
}
