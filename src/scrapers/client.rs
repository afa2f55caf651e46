//! HTTP access for the scrapers and the media pool.
//!
//! All network traffic goes through the [`DocumentFetcher`] trait so the
//! scrapers can be exercised against canned payloads. The real
//! implementation is a thin wrapper over a shared `reqwest` client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::IngestConfig;
use crate::error::IngestError;

/// Reject anything that is not plain http(s) before it reaches the client.
fn check_url(raw: &str) -> Result<(), IngestError> {
    let parsed = Url::parse(raw).map_err(|_| IngestError::InvalidUrl(raw.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(IngestError::InvalidUrl(raw.to_string())),
    }
}

/// Fetch port: JSON documents and raw media bodies.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// GET a URL and decode the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, IngestError>;

    /// GET a URL and return the raw body bytes.
    ///
    /// Non-2xx statuses are errors; the body is read to completion in
    /// chunks, so large assets do not need a contiguous network read.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, IngestError>;
}

/// `reqwest`-backed fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &IngestConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .gzip(true)
            .brotli(true)
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn get_json(&self, url: &str) -> Result<Value, IngestError> {
        check_url(url)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status { status: status.as_u16(), url: url.to_string() });
        }
        Ok(response.json().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, IngestError> {
        check_url(url)?;
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status { status: status.as_u16(), url: url.to_string() });
        }

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}
