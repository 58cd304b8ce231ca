use crate::pricing::round2;

/// Fraction of the first observed price used when no threshold was given.
pub const INITIAL_THRESHOLD_RATIO: f64 = 0.9;

/// Inclusive: a price exactly at the threshold triggers a notification.
pub fn should_notify(observed_price: f64, target_price: f64) -> bool {
    observed_price <= target_price
}

/// Threshold derived from the first successful observation of a target.
pub fn derive_initial_threshold(first_price: f64) -> f64 {
    round2(first_price * INITIAL_THRESHOLD_RATIO)
}
