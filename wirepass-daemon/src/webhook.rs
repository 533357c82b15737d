//! Webhook notifier.
//!
//! POSTs expiry notices as JSON to the messaging front-end, which renders
//! and delivers them to the subscriber's chat.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use wirepass_engine::{Notifier, NotifyError, NotifyResult};
use wirepass_types::SubscriberId;

#[derive(Serialize)]
struct NotifyPayload<'a> {
    subscriber_id: &'a str,
    text: &'a str,
}

pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to create HTTP client");

        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subscriber: &SubscriberId, text: &str) -> NotifyResult<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(&NotifyPayload {
                subscriber_id: subscriber.as_str(),
                text,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Delivery(format!(
                "front-end returned {}",
                resp.status()
            )))
        }
    }
}
