use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::pricing::format_price;
use crate::utils::error::NotificationError;

/// A threshold crossing worth telling the owner about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub target_id: String,
    pub title: String,
    /// Price text as extracted from the page.
    pub current_price: String,
    pub threshold: f64,
    pub url: String,
}

impl NotificationEvent {
    pub fn message(&self) -> String {
        format!(
            "Price drop alert! {} is now {}.\nTarget price was {}.\nURL: {}",
            self.title,
            self.current_price,
            format_price(Some(self.threshold)),
            self.url
        )
    }
}

/// Delivery channel for alert messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, destination: &str, message: &str) -> Result<(), NotificationError>;
}
