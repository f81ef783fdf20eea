use anyhow::Result;
use tankmon_common::types::Notification;

const MAX_ATTEMPTS: u32 = 3;

/// Best-effort webhook delivery.
///
/// `dispatch` is a fire-and-forget send: the POST runs on a spawned task and
/// every failure is logged and swallowed, so webhook trouble can never abort
/// rule evaluation or fail an ingestion request.
pub struct WebhookDispatcher {
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn dispatch(&self, url: &str, notification: &Notification) {
        let client = self.client.clone();
        let url = url.to_string();
        let body = match serde_json::to_value(notification) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize webhook payload");
                return;
            }
        };
        tokio::spawn(async move {
            if let Err(e) = post_with_retry(&client, &url, &body).await {
                tracing::warn!(url = %url, error = %e, "Webhook delivery failed after retries");
            }
        });
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn post_with_retry(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
) -> Result<()> {
    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        match client.post(url).json(body).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    status = %resp.status(),
                    "Webhook returned non-success status, retrying"
                );
                last_err = Some(anyhow::anyhow!("HTTP {}", resp.status()));
            }
            Err(e) => {
                tracing::warn!(attempt = attempt + 1, error = %e, "Webhook send failed, retrying");
                last_err = Some(e.into());
            }
        }
        if attempt + 1 < MAX_ATTEMPTS {
            tokio::time::sleep(std::time::Duration::from_millis(100 * 2u64.pow(attempt))).await;
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("webhook send failed")))
}
