use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::error::Result;
use crate::models::CandidateItem;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Outcome of posting one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub success: bool,
    pub detail: String,
}

impl DeliveryResult {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
        }
    }

    fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
        }
    }
}

/// Something that can take a candidate item off our hands.
pub trait Deliver {
    fn deliver(&self, item: &CandidateItem) -> impl Future<Output = DeliveryResult> + Send;
}

/// Posts items to the ingest endpoint, one request per item.
pub struct DeliveryClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl DeliveryClient {
    pub fn new(api_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    pub async fn post(&self, item: &CandidateItem) -> DeliveryResult {
        let mut request = self.client.post(&self.api_url).json(item);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return DeliveryResult::failed(e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            return DeliveryResult::ok(status.as_u16().to_string());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => json.to_string(),
            Err(_) => body,
        };
        DeliveryResult::failed(format!("HTTP {}: {}", status.as_u16(), detail))
    }
}

impl Deliver for DeliveryClient {
    fn deliver(&self, item: &CandidateItem) -> impl Future<Output = DeliveryResult> + Send {
        self.post(item)
    }
}
