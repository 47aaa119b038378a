//! Browser-like session handling.
//!
//! The upstream site only serves its data endpoints to clients that first
//! load an entry page and carry back the cookies it sets. This module holds:
//! - [`Session`]: the cookie/header bundle for one handshake
//! - [`SessionSource`]: the handshake seam, with [`Handshake`] as the real implementation
//! - [`SessionManager`]: owns the current session and coalesces refreshes

mod handshake;
mod manager;

pub use handshake::{browser_headers, Handshake, ENTRY_PAGE};
pub use manager::SessionManager;

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};

use crate::errors::MarketDataError;

/// Credentials obtained from one handshake.
///
/// Immutable once stamped by the [`SessionManager`]; a refresh produces a new
/// `Session` with a higher generation rather than modifying this one.
#[derive(Clone)]
pub struct Session {
    cookies: Vec<(String, String)>,
    headers: HeaderMap,
    generation: u64,
    expires_at: Instant,
}

impl Session {
    /// Create an unstamped session from cookie pairs and base headers.
    ///
    /// A later cookie with the same name replaces an earlier one.
    pub fn new(cookies: Vec<(String, String)>, headers: HeaderMap) -> Self {
        let mut deduped: Vec<(String, String)> = Vec::with_capacity(cookies.len());
        for (name, value) in cookies {
            match deduped.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => deduped.push((name, value)),
            }
        }

        Self {
            cookies: deduped,
            headers,
            generation: 0,
            expires_at: Instant::now(),
        }
    }

    /// Build a session from raw `Set-Cookie` header values.
    pub fn from_set_cookies<I, S>(set_cookies: I, headers: HeaderMap) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cookies = set_cookies
            .into_iter()
            .filter_map(|raw| parse_set_cookie(raw.as_ref()))
            .collect();
        Self::new(cookies, headers)
    }

    /// Assign the generation number and lifetime. Called by the manager only.
    ///
    /// A lifetime past what `Instant` can represent is clamped to one day.
    pub(crate) fn stamp(mut self, generation: u64, ttl: Duration) -> Self {
        let now = Instant::now();
        self.generation = generation;
        self.expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(86_400));
        self
    }

    /// Monotonic counter identifying which handshake produced this session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the session's lifetime has elapsed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Look up a cookie value by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of cookies held.
    pub fn cookie_count(&self) -> usize {
        self.cookies.len()
    }

    /// Render the cookies as a `Cookie` request header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Headers to attach to a data request: the base headers plus `Cookie`.
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if let Some(cookie) = self.cookie_header() {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.insert(COOKIE, value);
            }
        }
        headers
    }
}

// Cookie values are credentials; only names are printed.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.cookies.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Session")
            .field("generation", &self.generation)
            .field("cookies", &names)
            .field("expired", &self.is_expired())
            .finish()
    }
}

/// Extract the `name=value` pair from a `Set-Cookie` header value.
fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split_once(';').map(|(v, _)| v).unwrap_or(raw);
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Produces fresh sessions by performing a handshake with upstream.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Perform one handshake.
    ///
    /// Fails with [`MarketDataError::Connectivity`] on network failure and
    /// [`MarketDataError::UpstreamBlocked`] if the handshake is rejected.
    async fn acquire(&self) -> Result<Session, MarketDataError>;
}
