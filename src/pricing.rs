//! Price normalization: unstructured currency text to a canonical `f64` and back.

use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::LazyLock;

/// Display sentinel for a price that could not be determined.
pub const PRICE_NOT_FOUND: &str = "Price not found";

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid price token pattern"));

/// Parses the first numeric token of `text` as a price.
///
/// Thousands separators are stripped before matching, so `"$1,234.56"` yields
/// `1234.56`. Returns `None` for the not-found sentinel and for text without
/// any digits; malformed input is never an error.
pub fn parse_price(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(PRICE_NOT_FOUND) {
        return None;
    }

    let cleaned = trimmed.replace(',', "");
    let token = NUMBER_TOKEN.find(&cleaned)?;
    Decimal::from_str(token.as_str()).ok()?.to_f64()
}

/// Renders a price as `"$"` followed by the value rounded to two decimals.
pub fn format_price(value: Option<f64>) -> String {
    match value.and_then(to_cents) {
        Some(amount) => format!("${:.2}", amount),
        None => PRICE_NOT_FOUND.to_string(),
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    to_cents(value)
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

fn to_cents(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}
