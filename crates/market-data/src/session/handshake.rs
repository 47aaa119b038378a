//! Entry-page handshake.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use super::{Session, SessionSource};
use crate::classify::challenge_signature;
use crate::config::ClientConfig;
use crate::errors::MarketDataError;
use crate::transport::{Transport, UpstreamRequest};

/// Page loaded to obtain baseline cookies.
pub const ENTRY_PAGE: &str = "/market-data/live-equity-market";

/// Headers that make requests look like the site's own XHR calls.
pub fn browser_headers(config: &ClientConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let referer = config.url_for(ENTRY_PAGE);

    let header_list = [
        ("accept", "application/json, text/plain, */*"),
        ("accept-language", "en-US,en;q=0.9"),
        ("cache-control", "no-cache"),
        ("pragma", "no-cache"),
        ("referer", referer.as_str()),
        ("x-requested-with", "XMLHttpRequest"),
        ("user-agent", config.user_agent.as_str()),
    ];

    for (name, value) in header_list {
        if let (Ok(h_name), Ok(h_value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(h_name, h_value);
        }
    }

    headers
}

/// Production [`SessionSource`]: loads the entry page and keeps its cookies.
pub struct Handshake {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl Handshake {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl SessionSource for Handshake {
    async fn acquire(&self) -> Result<Session, MarketDataError> {
        let mut headers = browser_headers(&self.config);
        // The entry page is a document, not an XHR
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        headers.remove("x-requested-with");

        let request = UpstreamRequest {
            url: self.config.url_for(ENTRY_PAGE),
            endpoint: ENTRY_PAGE,
            headers,
        };

        let response = tokio::time::timeout(self.config.timeout(), self.transport.get(&request))
            .await
            .map_err(|_| MarketDataError::Connectivity {
                message: format!(
                    "handshake timed out after {:.1}s",
                    self.config.timeout_seconds
                ),
            })??;

        if !response.is_success() {
            warn!("Handshake rejected with HTTP {}", response.status);
            return Err(MarketDataError::UpstreamBlocked {
                status: response.status,
                reason: format!("handshake returned HTTP {}", response.status),
            });
        }

        if let Some(signature) = challenge_signature(&response) {
            warn!("Handshake served a challenge page ('{}')", signature);
            return Err(MarketDataError::UpstreamBlocked {
                status: response.status,
                reason: format!("handshake served challenge page ('{}')", signature),
            });
        }

        let session =
            Session::from_set_cookies(&response.set_cookies, browser_headers(&self.config));

        if session.cookie_count() == 0 {
            return Err(MarketDataError::UpstreamBlocked {
                status: response.status,
                reason: "handshake issued no cookies".to_string(),
            });
        }

        debug!("Handshake obtained {} cookies", session.cookie_count());
        Ok(session)
    }
}
