use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;

use crate::event::OutboundPayload;

/// HTTP client bound to one webhook URL. Holds no cross-call state;
/// every `send` is one independent POST.
pub struct WebhookClient {
    http: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, url })
    }

    /// POST one payload to the webhook.
    ///
    /// A 2xx response with an empty body is success with no reply. Network
    /// errors, timeouts, non-2xx statuses and unparsable bodies all come
    /// back as one error; the caller treats them as "no reply".
    pub async fn send(&self, payload: &OutboundPayload) -> Result<Option<Value>> {
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .context("Failed to send data to webhook")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Webhook returned {status}");
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read webhook response body")?;

        info!("Successfully sent data to webhook: {status}");
        decode_body(&body)
    }
}

fn decode_body(body: &[u8]) -> Result<Option<Value>> {
    if body.is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_slice(body).context("Webhook response is not valid JSON")?;
    Ok(Some(value))
}
