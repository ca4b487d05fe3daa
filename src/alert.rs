//! Alert sink (C8): a bounded-priority notification surface shared by the
//! core and workers.

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Result, StarfleetError};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertPriority {
    None,
    Problem,
    Important,
    Success,
    Informational,
}

#[derive(Debug, Serialize)]
struct AlertMessage {
    title: String,
    body: String,
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn emit(&self, priority: AlertPriority, title: &str, body: &str) -> Result<()>;
}

/// Emits to `sink` iff `configured_priority >= message_priority > NONE`
/// (spec.md §4.8). Problem alerts raise on sink error; others log on sink
/// error.
pub async fn send_alert(
    sink: &dyn AlertSink,
    configured_priority: AlertPriority,
    message_priority: AlertPriority,
    title: &str,
    body: &str,
) -> Result<()> {
    if message_priority == AlertPriority::None || configured_priority < message_priority {
        return Ok(());
    }
    match sink.emit(message_priority, title, body).await {
        Ok(()) => Ok(()),
        Err(e) if message_priority == AlertPriority::Problem => {
            Err(StarfleetError::SinkError(e.to_string()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "alert sink call failed, continuing");
            Ok(())
        }
    }
}

/// Four call styles matching spec.md §4.8, each producing a two-block
/// structured message.
pub async fn send_info(sink: &dyn AlertSink, configured: AlertPriority, title: &str, body: &str) -> Result<()> {
    send_alert(sink, configured, AlertPriority::Informational, title, body).await
}

pub async fn send_success(sink: &dyn AlertSink, configured: AlertPriority, title: &str, body: &str) -> Result<()> {
    send_alert(sink, configured, AlertPriority::Success, title, body).await
}

pub async fn send_important(sink: &dyn AlertSink, configured: AlertPriority, title: &str, body: &str) -> Result<()> {
    send_alert(sink, configured, AlertPriority::Important, title, body).await
}

pub async fn send_problem(sink: &dyn AlertSink, configured: AlertPriority, title: &str, body: &str) -> Result<()> {
    send_alert(sink, configured, AlertPriority::Problem, title, body).await
}

/// Webhook-shaped chat notifier: posts a two-block structured JSON payload.
pub struct WebhookAlertSink {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookAlertSink {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn emit(&self, priority: AlertPriority, title: &str, body: &str) -> Result<()> {
        let payload = serde_json::json!({
            "blocks": [
                {"type": "header", "text": format!("[{priority:?}] {title}")},
                {"type": "section", "text": body},
            ]
        });
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| StarfleetError::SinkError(e.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Debug for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AlertPriority::None => "NONE",
            AlertPriority::Problem => "PROBLEM",
            AlertPriority::Important => "IMPORTANT",
            AlertPriority::Success => "SUCCESS",
            AlertPriority::Informational => "INFORMATIONAL",
        };
        f.write_str(label)
    }
}
