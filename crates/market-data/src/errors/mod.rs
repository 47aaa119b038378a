//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all retrieval operations
//! - [`ErrorKind`]: A fieldless discriminant for matching on error kinds
//! - [`RetryClass`]: Classification for determining caller retry behavior

mod retry;

pub use retry::RetryClass;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during market data retrieval.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which tells the caller whether repeating the call can help.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Network failure, request timeout, or upstream server error.
    /// Caller may retry with backoff.
    #[error("Connectivity error: {message}")]
    Connectivity {
        /// Description of the transport failure
        message: String,
    },

    /// Upstream rejected the request as automated, and the rejection
    /// persisted after a session refresh (or the handshake itself failed).
    #[error("Upstream blocked request (status {status}): {reason}")]
    UpstreamBlocked {
        /// HTTP status of the last rejected response
        status: u16,
        /// Why the response was recognized as a block
        reason: String,
    },

    /// Upstream does not recognize the index code.
    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    /// Upstream reports the symbol does not exist.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Requested date range has `start > end`.
    /// Rejected before any network call.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange {
        /// Requested start date
        start: NaiveDate,
        /// Requested end date
        end: NaiveDate,
    },

    /// A response was received but does not match the expected structure.
    /// Terminal: a schema change is not fixed by retrying.
    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse {
        /// The endpoint path that produced the response
        endpoint: String,
        /// What was missing or unparseable
        message: String,
    },

    /// The client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Fieldless discriminant of [`MarketDataError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Connectivity,
    UpstreamBlocked,
    UnknownIndex,
    UnknownSymbol,
    InvalidRange,
    MalformedResponse,
    InvalidConfig,
}

impl MarketDataError {
    /// Shorthand for a [`MarketDataError::MalformedResponse`].
    pub(crate) fn malformed(endpoint: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// Returns the kind of this error without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::UpstreamBlocked { .. } => ErrorKind::UpstreamBlocked,
            Self::UnknownIndex(_) => ErrorKind::UnknownIndex,
            Self::UnknownSymbol(_) => ErrorKind::UnknownSymbol,
            Self::InvalidRange { .. } => ErrorKind::InvalidRange,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Never`]: Don't retry, the error is terminal
    /// - [`RetryClass::WithBackoff`]: Retry later with exponential backoff
    ///
    /// # Examples
    ///
    /// ```
    /// use nse_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Connectivity { message: "timed out".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::UnknownSymbol("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // Transient - the same request may succeed later
            Self::Connectivity { .. } | Self::UpstreamBlocked { .. } => RetryClass::WithBackoff,

            // Terminal errors - never retry
            Self::UnknownIndex(_)
            | Self::UnknownSymbol(_)
            | Self::InvalidRange { .. }
            | Self::MalformedResponse { .. }
            | Self::InvalidConfig(_) => RetryClass::Never,
        }
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("request timed out: {}", error)
        } else {
            error.to_string()
        };
        Self::Connectivity { message }
    }
}
