use reqwest::Client;
use serde::Serialize;

use crate::models::user::UserId;

const ALERT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Webhook alert request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Webhook alert failed with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct AlertService {
    client: Client,
    webhook_url: Option<String>,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

impl AlertService {
    /// Without a webhook url every alert is a no-op.
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(ALERT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Sends an alert when a user tries to claim someone they referred.
    pub async fn send_circular_referral_alert(
        &self,
        user_id: UserId,
        referrer_id: UserId,
        code: &str,
    ) -> Result<(), AlertError> {
        let message = format!(
            "Referral abuse warning: user {} submitted code {} belonging to user {}, whom they referred.",
            user_id, code, referrer_id
        );

        self.send_webhook_alert(&message).await
    }

    pub async fn send_webhook_alert(&self, text: &str) -> Result<(), AlertError> {
        let Some(webhook_url) = &self.webhook_url else {
            tracing::debug!("Alert webhook not configured, dropping alert");
            return Ok(());
        };

        let payload = WebhookPayload { text };
        let res = self.client.post(webhook_url).json(&payload).send().await?;

        if res.status().is_success() {
            return Ok(());
        }

        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(AlertError::Rejected { status, body })
    }
}
