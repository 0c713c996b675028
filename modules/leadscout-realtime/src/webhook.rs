use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::{info, warn};

use leadscout_common::types::{ActivityEvent, Webhook};
use leadscout_store::{DocStore, UserStore};

type HmacSha256 = Hmac<Sha256>;

/// Delay before retry N+1. At most `MAX_ATTEMPTS` tries per (event, webhook);
/// retries of a single event are serialized, different events deliver in
/// parallel.
pub const RETRY_DELAYS: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(5),
    Duration::from_secs(30),
    Duration::from_secs(120),
    Duration::from_secs(600),
];
pub const MAX_ATTEMPTS: u32 = 5;
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32 },
    /// Webhook inactive or event type not subscribed.
    Skipped,
}

pub struct WebhookDispatcher {
    store: Arc<dyn DocStore>,
    http: reqwest::Client,
    retry_delays: Vec<Duration>,
    max_attempts: u32,
}

impl WebhookDispatcher {
    pub fn new(store: Arc<dyn DocStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            store,
            http,
            retry_delays: RETRY_DELAYS.to_vec(),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Override the retry ladder (tests use zero delays).
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Fire-and-forget fan-out: one spawned task per matching webhook.
    pub fn dispatch(self: &Arc<Self>, event: &ActivityEvent) {
        let dispatcher = self.clone();
        let event = event.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.deliver_event(&event).await {
                warn!(user_id = %event.user_id, error = %e, "Webhook fan-out failed");
            }
        });
    }

    /// Deliver one event to every matching active webhook, awaiting all
    /// deliveries. Returns one outcome per webhook considered.
    pub async fn deliver_event(&self, event: &ActivityEvent) -> Result<Vec<DeliveryOutcome>> {
        let user = UserStore::new(self.store.clone(), &event.user_id);
        let webhooks = user.list_webhooks(true).await?;

        let mut deliveries = Vec::new();
        for webhook in webhooks {
            deliveries.push(self.deliver_to_webhook(&user, webhook, event));
        }

        Ok(futures::future::join_all(deliveries).await)
    }

    async fn deliver_to_webhook(
        &self,
        user: &UserStore,
        webhook: Webhook,
        event: &ActivityEvent,
    ) -> DeliveryOutcome {
        if !webhook.active || !webhook.event_types.contains(&event.activity_type) {
            return DeliveryOutcome::Skipped;
        }

        let body = json!({
            "event": event.activity_type.to_string(),
            "payload": event,
        });
        let body_bytes = serde_json::to_vec(&body).unwrap_or_default();
        let signature = webhook
            .secret
            .as_deref()
            .map(|secret| sign_body(secret, &body_bytes));

        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.attempt(&webhook.url, &body_bytes, signature.as_deref()).await {
                Ok(()) => {
                    info!(webhook_id = %webhook.id, url = %webhook.url, attempts, "Webhook delivered");
                    self.record_success(user, &webhook.id).await;
                    return DeliveryOutcome::Delivered { attempts };
                }
                Err(e) => {
                    warn!(
                        webhook_id = %webhook.id,
                        url = %webhook.url,
                        attempt = attempts,
                        error = %e,
                        "Webhook delivery attempt failed"
                    );
                    if attempts >= self.max_attempts {
                        self.record_failure(user, &webhook.id).await;
                        return DeliveryOutcome::Failed { attempts };
                    }
                    let delay = self
                        .retry_delays
                        .get((attempts - 1) as usize)
                        .copied()
                        .unwrap_or_else(|| *RETRY_DELAYS.last().unwrap());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, url: &str, body: &[u8], signature: Option<&str>) -> Result<()> {
        let mut request = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_vec());

        if let Some(sig) = signature {
            request = request.header("X-Signature", sig);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("webhook endpoint returned {status}");
        }
        Ok(())
    }

    async fn record_success(&self, user: &UserStore, webhook_id: &str) {
        if let Ok(Some(mut webhook)) = user.get_webhook(webhook_id).await {
            if webhook.consecutive_failures > 0 {
                webhook.consecutive_failures = 0;
                let _ = user.save_webhook(&webhook).await;
            }
        }
    }

    /// Persistent failure: bump the counter, auto-disable at the threshold.
    async fn record_failure(&self, user: &UserStore, webhook_id: &str) {
        if let Ok(Some(mut webhook)) = user.get_webhook(webhook_id).await {
            webhook.consecutive_failures += 1;
            if webhook.consecutive_failures >= webhook.disabled_after_failures {
                webhook.active = false;
                warn!(
                    webhook_id,
                    failures = webhook.consecutive_failures,
                    "Webhook auto-disabled after repeated failures"
                );
            }
            let _ = user.save_webhook(&webhook).await;
        }
    }
}

/// `X-Signature` value: hex-encoded HMAC-SHA256 of the request body.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
