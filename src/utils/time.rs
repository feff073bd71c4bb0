use tokio::time::Duration;
use tokio::time::Instant;

/// Converts a millisecond interval as carried on the wire into a Duration.
/// Negative and NaN inputs map to zero.
pub(crate) fn millis_to_duration(ms: f64) -> Duration {
    if ms > 0.0 {
        Duration::from_micros((ms * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

/// return milliseconds
pub(crate) fn elapsed_ms(
    since: Instant,
    now: Instant,
) -> f64 {
    now.saturating_duration_since(since).as_secs_f64() * 1000.0
}
