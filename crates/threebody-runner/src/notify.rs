use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use threebody_models::{Notification, TradeAction};
use tracing::{debug, info, warn};

use crate::error::NotifyError;

pub const DISCORD_USERNAME: &str = "The Three-Body Portfolio";
const DISCORD_FOOTER: &str = "Three-Body DAO";

const COLOR_BUY: u32 = 0x00ff00;
const COLOR_SELL: u32 = 0xff0000;
const COLOR_HOLD: u32 = 0x808080;

/// An independently failable destination for cycle notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

fn http_client(timeout_seconds: u64) -> Result<Client, NotifyError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}

async fn post_json(
    client: &Client,
    sink: &str,
    url: &str,
    payload: &Value,
) -> Result<(), NotifyError> {
    let response = client.post(url).json(payload).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NotifyError::Rejected {
            sink: sink.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    debug!(sink, status = status.as_u16(), "Notification delivered");
    Ok(())
}

/// Discord webhook with a colored embed.
pub struct DiscordSink {
    client: Client,
    webhook_url: String,
}

impl DiscordSink {
    pub fn new(webhook_url: &str, timeout_seconds: u64) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            webhook_url: webhook_url.to_string(),
        })
    }

    /// Build the embed payload. HOLD reads as sleeping regardless of success.
    pub fn payload(notification: &Notification) -> Value {
        let (status, color) = match notification.action {
            TradeAction::Hold => ("zzZ Sleeping", COLOR_HOLD),
            TradeAction::Buy if notification.success => ("✅ Executed", COLOR_BUY),
            TradeAction::Sell if notification.success => ("✅ Executed", COLOR_SELL),
            TradeAction::Buy => ("❌ Rejected", COLOR_BUY),
            TradeAction::Sell => ("❌ Rejected", COLOR_SELL),
        };

        json!({
            "username": DISCORD_USERNAME,
            "embeds": [{
                "title": format!("{status}: {} {}", notification.action, notification.asset),
                "description": format!(
                    "**Winner:** {}\n**Logic:** {}",
                    notification.agent_name, notification.rationale
                ),
                "color": color,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "footer": { "text": DISCORD_FOOTER }
            }]
        })
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        post_json(
            &self.client,
            self.name(),
            &self.webhook_url,
            &Self::payload(notification),
        )
        .await
    }
}

/// Generic HTTP sink posting the notification as JSON.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str, timeout_seconds: u64) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = json!(notification);
        post_json(&self.client, self.name(), &self.url, &payload).await
    }
}

/// Delivers to every sink in order. One sink's failure never stops the rest.
#[derive(Clone, Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanOut {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Returns how many sinks accepted the notification.
    pub async fn deliver(&self, notification: &Notification) -> usize {
        let mut delivered = 0;
        for sink in &self.sinks {
            match sink.notify(notification).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(sink = sink.name(), error = %e, "Notification failed"),
            }
        }
        info!(delivered, sinks = self.sinks.len(), "Notifications sent");
        delivered
    }
}
