use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::PRESENT_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::types::NotificationEvent;

/// Where composed notifications are shown to the user.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Primary surface. An error sends the event to [`Presenter::present_fallback`].
    async fn present(&self, event: &NotificationEvent) -> Result<()>;

    /// Simpler host-level surface. Fire-and-forget: never fails.
    async fn present_fallback(&self, event: &NotificationEvent);
}

/// POSTs each event as JSON to a webhook; falls back to a structured log line.
pub struct WebhookPresenter {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookPresenter {
    pub fn new(url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PRESENT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Presenter for WebhookPresenter {
    async fn present(&self, event: &NotificationEvent) -> Result<()> {
        let Some(url) = &self.url else {
            return Err(AppError::Presentation("no webhook configured".to_string()));
        };
        self.client
            .post(url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn present_fallback(&self, event: &NotificationEvent) {
        info!(
            event = "NOTIFICATION",
            fixture_id = %event.fixture_id,
            kind = %event.kind,
            "{} | {} | {} ({})",
            event.headline, event.score_summary, event.sub_message, event.elapsed_or_status,
        );
    }
}
