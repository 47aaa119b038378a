//! `reqwest`-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use reqwest::Client;
use tracing::debug;

use super::{Transport, UpstreamRequest, UpstreamResponse};
use crate::config::ClientConfig;
use crate::errors::MarketDataError;

/// Production [`Transport`] over a pooled `reqwest::Client`.
///
/// Cookies are not stored by the client: the session manager owns them and
/// each request carries its own `Cookie` header.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport honoring the configured per-request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, MarketDataError> {
        Self::with_timeout(config.timeout())
    }

    /// Create a transport with an explicit per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                MarketDataError::InvalidConfig(format!("Failed to initialize HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, MarketDataError> {
        debug!("GET {}", request.url);

        let response = self
            .client
            .get(&request.url)
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = response.text().await?;

        debug!(
            "{} responded {} ({} bytes)",
            request.endpoint,
            status,
            body.len()
        );

        Ok(UpstreamResponse {
            status,
            content_type,
            set_cookies,
            body,
        })
    }
}
