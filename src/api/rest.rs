use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use super::{Customer, CustomerApi, CustomerUpdate};
use crate::consts::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};

/// Errors from the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Connection settings for [`RestCustomerApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. `https://shop.example/wp-json/wc/v3`.
    pub base_url: String,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            consumer_key: None,
            consumer_secret: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Customer records over HTTP.
///
/// `GET {base}/customers/{id}` reads a record, `PUT {base}/customers/{id}`
/// with a `{ "meta_data": [...] }` body writes metadata. Requests carry HTTP
/// basic auth when a consumer key is configured.
pub struct RestCustomerApi {
    client: reqwest::Client,
    config: ApiConfig,
}

impl RestCustomerApi {
    pub fn new(config: ApiConfig) -> std::result::Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn customer_url(&self, id: &str) -> String {
        format!(
            "{}/customers/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoded(id)
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.consumer_key {
            Some(key) => req.basic_auth(key, self.config.consumer_secret.as_ref()),
            None => req,
        }
    }

    async fn fetch(&self, id: &str) -> std::result::Result<Customer, ApiError> {
        let resp = self
            .authorize(self.client.get(self.customer_url(id)))
            .send()
            .await?;
        let body = checked_body(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn store(&self, id: &str, update: &CustomerUpdate) -> std::result::Result<(), ApiError> {
        let resp = self
            .authorize(self.client.put(self.customer_url(id)))
            .json(update)
            .send()
            .await?;
        checked_body(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerApi for RestCustomerApi {
    async fn get_customer_by_id(&self, id: &str) -> Result<Customer> {
        Ok(self.fetch(id).await?)
    }

    async fn update_customer_by_id(&self, id: &str, update: &CustomerUpdate) -> Result<()> {
        Ok(self.store(id, update).await?)
    }
}

/// Read the body, turning non-success statuses into [`ApiError::Status`].
async fn checked_body(resp: reqwest::Response) -> std::result::Result<String, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status { status, body });
    }
    Ok(body)
}

/// Percent-encode a path segment.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push_str(&format!("%{:02X}", b));
            }
        }
    }
    out
}
