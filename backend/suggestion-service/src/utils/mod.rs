// Utility functions for suggestion-service

/// Scale `value` into `[0, 1]`, saturating once it reaches `cap`.
/// Equivalent to `min(value / cap, 1)` for non-negative input; `+inf`
/// saturates to 1, NaN and a non-positive cap give 0.
pub fn saturate(value: f64, cap: f64) -> f64 {
    if !(cap >= f64::EPSILON) {
        return 0.0;
    }
    let ratio = value / cap;
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

/// Round to two decimal places for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// "1 mutual connection" / "3 mutual connections"
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}
