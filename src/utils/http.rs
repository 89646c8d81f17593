// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};

use crate::error::{AppError, Result};
use crate::models::ApiConfig;

/// Status, rate-limit hint and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// `Retry-After` in whole seconds, when the server sent one
    pub retry_after: Option<u64>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }
}

/// Issues authenticated GET requests.
///
/// `Err` means no response was obtained at all (timeout, reset, DNS).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client with the credential
/// attached as a default header.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config, api_key)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response.bytes().await?.to_vec();
        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ApiConfig, api_key: &str) -> Result<reqwest::Client> {
    let name = HeaderName::from_bytes(config.credential_header.as_bytes())
        .map_err(|e| AppError::config(format!("invalid credential header name: {e}")))?;
    let mut value = HeaderValue::from_str(api_key)
        .map_err(|e| AppError::config(format!("invalid api key: {e}")))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(name, value);

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(7));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_client_rejects_bad_header_name() {
        let config = ApiConfig {
            credential_header: "bad header".into(),
            ..ApiConfig::default()
        };
        assert!(create_async_client(&config, "key").is_err());
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(HttpTransport::new(&ApiConfig::default(), "RGAPI-key").is_ok());
    }
}
