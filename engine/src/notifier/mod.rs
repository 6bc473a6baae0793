//! Completion webhook
//!
//! Posts the [`NotificationPayload`] to the caller's evaluation URL. A
//! delivery counts only when the endpoint answers exactly `200`. Failed
//! attempts are retried on a fixed schedule; once the schedule is used up
//! the failure is logged and the round is left as it is.

use crate::config::NotifierConfig;
use async_trait::async_trait;
use sdk::NotificationPayload;
use std::sync::Arc;
use std::time::Duration;

/// One HTTP POST of the payload, returning the status code
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String>;
}

/// `reqwest` transport with a per-attempt timeout
pub struct HttpWebhook {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpWebhook {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhook {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status, body = %body.chars().take(200).collect::<String>(), "Webhook rejected payload");
        }
        Ok(status)
    }
}

/// Wait after each failed attempt. One attempt per entry; no wait follows
/// the final attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: [1, 2, 4, 8, 16].into_iter().map(Duration::from_secs).collect(),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> usize {
        self.delays.len().max(1)
    }
}

/// What happened to one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub delivered: bool,
    pub attempts: usize,
}

/// Webhook notifier with bounded retries
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn WebhookTransport>,
    policy: RetryPolicy,
}

impl Notifier {
    pub fn new(transport: Arc<dyn WebhookTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn from_config(config: &NotifierConfig) -> Self {
        Self::new(
            Arc::new(HttpWebhook::new(Duration::from_secs(config.timeout_secs))),
            RetryPolicy {
                delays: config.delays(),
            },
        )
    }

    /// Deliver `payload` to `url`. Never fails; the outcome is for logging.
    pub async fn notify(&self, url: &str, payload: &NotificationPayload) -> NotifyOutcome {
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            match self.transport.post(url, payload).await {
                Ok(200) => {
                    tracing::info!(attempt, task = %payload.task, round = %payload.round, "Notification delivered");
                    return NotifyOutcome {
                        delivered: true,
                        attempts: attempt,
                    };
                }
                Ok(status) => tracing::warn!(attempt, status, "Notification attempt rejected"),
                Err(e) => tracing::warn!(attempt, error = %e, "Notification attempt failed"),
            }

            if attempt < attempts {
                if let Some(delay) = self.policy.delays.get(attempt - 1) {
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        tracing::error!(
            attempts,
            task = %payload.task,
            round = %payload.round,
            "Notification not delivered, giving up"
        );
        NotifyOutcome {
            delivered: false,
            attempts,
        }
    }
}
