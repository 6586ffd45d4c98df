//! Rounding and tolerance helpers shared by the balance engine and the reconciler.
//!
//! Each tolerance belongs to exactly one decision (split mode, remainder correction,
//! commit check, settlement display) and they are not interchangeable.

/// Weights closer than this are treated as equal when choosing the split mode.
pub const SPLIT_MODE_TOLERANCE: f64 = 0.01;

/// Differences at or below this are left alone by the reconciler's remainder correction.
pub const REMAINDER_TOLERANCE: f64 = 0.001;

/// Allowed distance from 100 for the sum of custom percentages at commit time.
pub const COMMIT_PERCENTAGE_TOLERANCE: f64 = 0.1;

/// Balances with a magnitude at or below this are displayed as settled.
pub const SETTLEMENT_THRESHOLD: f64 = 0.005;

/// Totals at or below this cannot be distributed.
pub const MIN_DISTRIBUTABLE_TOTAL: f64 = 0.001;

/// The proportion basis consumer weights are expressed in.
pub const FULL_PERCENTAGE: f64 = 100.0;

/// Rounds `value` half away from zero to `places` decimal places.
#[must_use]
pub fn round_to_places(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places.try_into().unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Rounds to cents.
#[must_use]
pub fn round2(value: f64) -> f64 {
    round_to_places(value, 2)
}

/// `true` when `a` and `b` differ by strictly less than `tolerance`.
#[must_use]
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

/// Replaces negative, NaN and infinite weights with zero.
#[must_use]
pub fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// `true` when every weight is within [`SPLIT_MODE_TOLERANCE`] of the first one.
///
/// Zero or one weight always counts as equal.
#[must_use]
pub fn weights_are_equal<I>(weights: I) -> bool
where
    I: IntoIterator<Item = f64>,
{
    let mut iter = weights.into_iter();
    let Some(first) = iter.next() else {
        return true;
    };
    iter.all(|w| approx_eq(w, first, SPLIT_MODE_TOLERANCE))
}
