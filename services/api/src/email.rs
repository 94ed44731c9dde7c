//! Outbound email notifications
//!
//! Sends task lifecycle notifications through the SendGrid v3 API.
//! Delivery is strictly best-effort: sends run on a detached task,
//! failures are logged and never reach the caller. The triggering
//! business operation has already committed by the time a send starts.

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{error, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

/// Email dispatcher backed by SendGrid
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_key: Option<String>,
    sender: String,
    base_url: String,
}

impl Mailer {
    /// Create a new Mailer from environment variables
    ///
    /// # Environment Variables
    /// - `SENDGRID_API_KEY`: API key; when unset the mailer is disabled
    ///   and sends become logged no-ops
    /// - `SENDER`: From address
    pub fn from_env() -> Self {
        let api_key = std::env::var("SENDGRID_API_KEY").ok();
        let sender = std::env::var("SENDER").unwrap_or_else(|_| "noreply@example.com".to_string());

        if api_key.is_none() {
            warn!("SENDGRID_API_KEY not set, email notifications are disabled");
        }

        Self {
            http: reqwest::Client::new(),
            api_key,
            sender,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_sender(sender: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: None,
            sender: sender.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build the SendGrid v3 mail payload
    fn build_payload(&self, to: &str, subject: &str, body: &str) -> Value {
        json!({
            "personalizations": [{
                "to": [{ "email": to }]
            }],
            "from": { "email": self.sender },
            "subject": subject,
            "content": [{
                "type": "text/plain",
                "value": body
            }]
        })
    }

    /// Send one email, returning any transport or API error
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let Some(api_key) = &self.api_key else {
            info!("Email disabled, skipping '{}' to {}", subject, to);
            return Ok(());
        };

        let response = self
            .http
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(api_key)
            .json(&self.build_payload(to, subject, body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("SendGrid returned {}: {}", status, detail);
        }

        info!("Email '{}' sent to {}", subject, to);
        Ok(())
    }

    /// Fire-and-forget send; failures are logged, never propagated
    pub fn spawn_send(&self, to: &str, subject: &str, body: &str) {
        let mailer = self.clone();
        let to = to.to_string();
        let subject = subject.to_string();
        let body = body.to_string();

        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &body).await {
                error!("Failed to send email '{}' to {}: {:#}", subject, to, e);
            }
        });
    }
}
