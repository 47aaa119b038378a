//! NSE Market Data Crate
//!
//! This crate retrieves index catalogues, index constituents, live quotes and
//! daily history from the National Stock Exchange of India public website.
//!
//! # Overview
//!
//! The site only answers its data endpoints for clients that behave like a
//! browser: it expects a handshake on an entry page, the cookies from that
//! handshake on every later request, and browser-like headers. The crate
//! supports:
//! - One owned session per client, refreshed transparently when it expires
//! - A single bounded retry through a session refresh on anti-bot rejection
//! - Tolerant parsing of JSON and CSV payloads into strict records
//! - Typed errors that distinguish blocks from unknown entities
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |    NseClient     | --> |  SessionManager  |  (single-flight handshake)
//! +------------------+     +------------------+
//!          |                        |
//!          |                        v
//!          |               +------------------+
//!          |               |  SessionSource   |  (Handshake on entry page)
//!          |               +------------------+
//!          v
//! +------------------+     +------------------+
//! |    Transport     | --> |    classify      |  (Ok / Blocked / NotFound / ...)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |     Parsers      |  (JSON / CSV to records)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`NseClient`] - Retrieval operations
//! - [`ClientConfig`] - Timeouts, retry budget, user agent, session lifetime
//! - [`Index`], [`StockRef`], [`Quote`], [`HistoricalBar`], [`IndexSnapshot`] - Records
//! - [`MarketDataError`] - Error kinds with [`RetryClass`] guidance
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use nse_market_data::{ClientConfig, NseClient};
//!
//! # async fn run() -> Result<(), nse_market_data::MarketDataError> {
//! let client = NseClient::new(ClientConfig::default())?;
//!
//! for index in client.list_indices().await? {
//!     println!("{}", index.code());
//! }
//!
//! let quote = client.get_live("INFY").await?;
//! println!("{} {}", quote.symbol, quote.price);
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
//! let bars = client.get_historical("TCS", start, end).await?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod session;
pub mod transport;

pub use client::NseClient;
pub use config::ClientConfig;

// Re-export error types
pub use errors::{ErrorKind, MarketDataError, RetryClass};

// Re-export all public types from models
pub use models::{
    normalize_bars, ConstituentSnapshot, HistoricalBar, Index, IndexSnapshot, Quote, StockRef,
};

// Re-export session and transport seams
pub use session::{Handshake, Session, SessionManager, SessionSource};
pub use transport::{HttpTransport, Transport, UpstreamRequest, UpstreamResponse};
