//! HTTP transport seam.
//!
//! The client and the session handshake talk to upstream only through the
//! [`Transport`] trait. [`HttpTransport`] is the production implementation;
//! tests substitute scripted transports.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::errors::MarketDataError;

/// A fully-formed upstream request.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
    /// Absolute URL including the query string
    pub url: String,
    /// Endpoint path without host or query, used for logging and errors
    pub endpoint: &'static str,
    /// Headers to send, including the session cookie when there is one
    pub headers: HeaderMap,
}

/// A raw upstream response, fully read into memory.
#[derive(Clone, Debug, Default)]
pub struct UpstreamResponse {
    /// The numeric HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Every `Set-Cookie` header value, verbatim.
    pub set_cookies: Vec<String>,
    /// Response body as text.
    pub body: String,
}

impl UpstreamResponse {
    /// Build a response with a status and body and no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Default::default()
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a `Set-Cookie` header value.
    pub fn with_cookie(mut self, set_cookie: impl Into<String>) -> Self {
        self.set_cookies.push(set_cookie.into());
        self
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body looks like an HTML document rather than data.
    pub fn is_html(&self) -> bool {
        if let Some(content_type) = &self.content_type {
            if content_type.to_ascii_lowercase().contains("text/html") {
                return true;
            }
        }
        self.body.trim_start().starts_with('<')
    }
}

/// Sends requests to the upstream site.
///
/// Implementations must not follow any retry policy of their own: the client
/// owns the single refresh-and-retry decision.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request and return the full response.
    ///
    /// Non-2xx statuses are returned as responses, not errors. Errors are
    /// reserved for failures to obtain a response at all.
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, MarketDataError>;
}
