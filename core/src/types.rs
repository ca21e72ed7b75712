//! Shared primitive types used across the cohort pipeline.

/// A stable, unique identifier for a user across all three source streams.
pub type UserId = String;

/// Raw currency units per crore. AUM cells are reported in crores.
pub const CRORE: f64 = 10_000_000.0;

/// Length of the trailing activity window behind `Current TAI`.
pub const ACTIVE_WINDOW_DAYS: i64 = 30;

/// Round to two decimal places, ties to even, judged on the exact binary
/// value: 0.125 → 0.12, but 0.005 (stored just above the half) → 0.01.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    // `mul_add` recovers the rounding error of the multiply exactly.
    let residual = value.mul_add(100.0, -scaled);
    let floor = scaled.floor();
    let frac = scaled - floor;

    let rounded = if frac > 0.5 || (frac == 0.5 && residual > 0.0) {
        floor + 1.0
    } else if frac < 0.5 || residual < 0.0 {
        floor
    } else {
        scaled.round_ties_even()
    };
    rounded / 100.0
}
