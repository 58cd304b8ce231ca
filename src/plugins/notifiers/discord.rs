use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::DiscordConfig;
use crate::plugins::traits::Notifier;
use crate::utils::error::NotificationError;

/// Discord rejects message content longer than this.
const MAX_CONTENT_CHARS: usize = 2000;

/// Posts alert messages to a Discord webhook.
pub struct DiscordNotifier {
    client: Client,
    username: String,
    avatar_url: Option<String>,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            username: config.username.clone(),
            avatar_url: config.avatar_url.clone(),
        }
    }

    fn create_webhook_payload(&self, message: &str) -> serde_json::Value {
        let content: String = message.chars().take(MAX_CONTENT_CHARS).collect();
        let mut payload = json!({
            "content": content,
            "username": self.username,
        });

        if let Some(avatar_url) = &self.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn notify(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        self.client
            .post(destination)
            .json(&self.create_webhook_payload(message))
            .send()
            .await?
            .error_for_status()?;

        tracing::info!("Discord webhook delivered");
        Ok(())
    }
}
