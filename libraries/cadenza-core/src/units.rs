//! Unit conversion between user-facing scalars and engine units
//!
//! All functions are pure. Gains are linear amplitude multipliers, levels are
//! decibels relative to unity, times are seconds.

/// Decibel value reported for a linear gain of zero.
///
/// `db_to_gain(SILENT_DB)` is exactly `0.0`.
pub const SILENT_DB: f64 = f64::NEG_INFINITY;

/// Convert linear gain to decibels.
///
/// - `1.0` → `0.0` dB (unity)
/// - `0.5` → ≈ `-6.02` dB
/// - `0.0` (or anything non-positive) → [`SILENT_DB`]
pub fn gain_to_db(gain: f64) -> f64 {
    if gain <= 0.0 || gain.is_nan() {
        return SILENT_DB;
    }
    20.0 * gain.log10()
}

/// Convert decibels to linear gain. Inverse of [`gain_to_db`].
pub fn db_to_gain(db: f64) -> f64 {
    if db == SILENT_DB || db.is_nan() {
        return 0.0;
    }
    10.0_f64.powf(db / 20.0)
}

/// Format seconds as `m:ss` (seconds floored and zero-padded).
///
/// Negative or non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Progress of `current` through `total`, in percent.
///
/// Clamped to `[0, 100]`; a non-positive `total` yields `0`.
pub fn calculate_progress(current: f64, total: f64) -> f64 {
    if total <= 0.0 || !total.is_finite() || current.is_nan() {
        return 0.0;
    }
    ((current / total) * 100.0).clamp(0.0, 100.0)
}

/// Wrap an elapsed time into `[0, duration)` for looped playback.
///
/// Returns `0` when `duration` is not positive or `elapsed` is negative.
pub fn looped_elapsed(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 || !duration.is_finite() || !elapsed.is_finite() || elapsed <= 0.0 {
        return 0.0;
    }
    let wrapped = elapsed % duration;
    // `%` on floats can round up to `duration` for values just below a multiple
    if wrapped >= duration {
        0.0
    } else {
        wrapped
    }
}

/// Convert a percentage (0-100) to a normalized value (0-1).
pub fn percent_to_unit(percent: f64) -> f64 {
    percent / 100.0
}

/// Convert a normalized value (0-1) to a percentage (0-100).
pub fn unit_to_percent(unit: f64) -> f64 {
    unit * 100.0
}
