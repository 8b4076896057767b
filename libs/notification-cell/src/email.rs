use std::sync::Arc;

use reqwest::Client;
use serde_json::json;
use shared_config::AppConfig;

/// Thin client for the outbound email API. Sending is best-effort: a failed
/// email must never fail the booking that triggered it, so callers log and
/// move on.
#[derive(Clone)]
pub struct EmailSender {
    client: Client,
    config: Arc<AppConfig>,
}

impl EmailSender {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        if !self.config.is_email_configured() {
            tracing::debug!(%to, %subject, "email not configured, skipping");
            return Ok(());
        }

        let payload = json!({
            "from": self.config.email_from,
            "to": to,
            "subject": subject,
            "text": body
        });

        let response = self
            .client
            .post(&self.config.email_api_url)
            .header("Authorization", format!("Bearer {}", self.config.email_api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("email API returned {}", response.status()));
        }

        tracing::debug!(%to, %subject, "email sent");
        Ok(())
    }
}
