use std::sync::Arc;

use crate::config::{NotificationChannel, NotificationsConfig};
use crate::plugins::notifiers::{DiscordNotifier, SignalNotifier};
use crate::plugins::traits::{NotificationEvent, Notifier};
use crate::utils::error::NotificationError;
use crate::utils::telemetry::metric;

/// Owns the configured notifier and destination. Sends each event once; never retries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    destination: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, destination: Option<String>) -> Self {
        Self { notifier, destination }
    }

    pub fn from_config(config: &NotificationsConfig) -> Self {
        match config.channel {
            NotificationChannel::Signal => Self::new(
                Arc::new(SignalNotifier::new(&config.signal)),
                config.signal.group_id.clone(),
            ),
            NotificationChannel::Discord => Self::new(
                Arc::new(DiscordNotifier::new(&config.discord)),
                config.discord.webhook_url.clone(),
            ),
        }
    }

    pub fn channel(&self) -> &'static str {
        self.notifier.name()
    }

    pub async fn dispatch(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        let result = match self.destination.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(destination) => self.notifier.notify(destination, &event.message()).await,
            None => Err(NotificationError::Configuration(format!(
                "No {} destination configured",
                self.notifier.name()
            ))),
        };

        match &result {
            Ok(()) => {
                metrics::counter!(metric::NOTIFICATIONS_SENT, "channel" => self.channel()).increment(1);
            }
            Err(e) => {
                metrics::counter!(
                    metric::NOTIFICATIONS_FAILED,
                    "channel" => self.channel(),
                    "error_type" => e.error_type()
                )
                .increment(1);
            }
        }

        result
    }
}
