use serde::{Deserialize, Serialize};

/// Descriptor handed to the delay queue so the next cycle for a target runs later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleContinuation {
    pub target_id: String,
    pub url: String,
    pub target_price: Option<f64>,
    pub delay_seconds: u64,
}

impl ScheduleContinuation {
    /// First cycle for a target: runs immediately.
    pub fn immediate(target_id: impl Into<String>, url: impl Into<String>, target_price: Option<f64>) -> Self {
        Self {
            target_id: target_id.into(),
            url: url.into(),
            target_price,
            delay_seconds: 0,
        }
    }

    pub fn after(&self, delay_seconds: u64, target_price: Option<f64>) -> Self {
        Self {
            target_id: self.target_id.clone(),
            url: self.url.clone(),
            target_price,
            delay_seconds,
        }
    }
}
