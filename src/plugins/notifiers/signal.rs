use async_trait::async_trait;
use tokio::process::Command;

use crate::config::SignalConfig;
use crate::plugins::traits::Notifier;
use crate::utils::error::NotificationError;

/// Sends group messages through a local `signal-cli` install.
pub struct SignalNotifier {
    cli_path: String,
    phone_number: Option<String>,
}

impl SignalNotifier {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            cli_path: config.cli_path.clone(),
            phone_number: config.phone_number.clone(),
        }
    }
}

fn redact(group_id: &str) -> &str {
    group_id.get(..8).unwrap_or(group_id)
}

#[async_trait]
impl Notifier for SignalNotifier {
    fn name(&self) -> &'static str {
        "signal"
    }

    async fn notify(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        let phone_number = self
            .phone_number
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| NotificationError::Configuration("Signal phone number is not configured".into()))?;

        tracing::info!(group = redact(destination), "Sending Signal message");

        let output = Command::new(&self.cli_path)
            .args(["-u", phone_number, "send", "-g", destination, "-m", message])
            .output()
            .await
            .map_err(|e| NotificationError::Transport(format!("Failed to run {}: {}", self.cli_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(NotificationError::Transport(format!(
                "signal-cli exited with {}: {}",
                output.status, stderr
            )));
        }

        tracing::info!(group = redact(destination), "Signal message sent");
        Ok(())
    }
}
