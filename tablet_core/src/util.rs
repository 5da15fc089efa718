//! Common time, period and byte helpers for tablet_core.

use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: f64 = 1_000.0;

/// Convert a tick interval in milliseconds to a `Duration`.
/// - Non-finite or non-positive values clamp to 1 microsecond.
/// - Values too large for a `Duration` saturate.
#[inline]
pub fn interval_from_ms(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::from_micros(1);
    }
    Duration::try_from_secs_f64(ms / MILLIS_PER_SEC)
        .unwrap_or(Duration::MAX)
        .max(Duration::from_micros(1))
}

/// Convert a `Duration` to fractional milliseconds.
#[inline]
pub fn interval_ms(d: Duration) -> f64 {
    d.as_secs_f64() * MILLIS_PER_SEC
}

/// Narrow an interleaved (UTF-16 style) descriptor by keeping every
/// even-indexed byte, zero bytes included. Only trailing NULs are dropped.
pub fn narrow_string(bytes: &[u8]) -> String {
    let narrowed: String = bytes.iter().step_by(2).map(|&b| char::from(b)).collect();
    narrowed.trim_end_matches('\0').to_string()
}

/// Space-separated lowercase hex, as used in raw buffer dumps.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .chunks(1)
        .map(::hex::encode)
        .collect::<Vec<_>>()
        .join(" ")
}
