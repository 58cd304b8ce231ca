use serde::{Deserialize, Serialize};

use crate::pricing::{PRICE_NOT_FOUND, parse_price};

/// Title sentinel when no title candidate matched.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Output of one extraction; transient, consumed within a single cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub title: String,
    pub price_text: String,
    pub normalized_price: Option<f64>,
}

impl ExtractionResult {
    pub fn new(title: Option<String>, price_text: Option<String>) -> Self {
        let price_text = price_text.unwrap_or_else(|| PRICE_NOT_FOUND.to_string());
        Self {
            title: title.unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
            normalized_price: parse_price(&price_text),
            price_text,
        }
    }

    /// Sentinel result used when the page could not be fetched at all.
    pub fn not_found() -> Self {
        Self::new(None, None)
    }
}
