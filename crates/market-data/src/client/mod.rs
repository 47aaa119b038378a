//! Retrieval client for the exchange's public market-data endpoints.
//!
//! Every operation follows the same protocol:
//! 1. take the current session (the manager performs the handshake if needed)
//! 2. send the request with the session's headers and cookies
//! 3. [`classify`] the response; on [`Verdict::Blocked`] refresh the session
//!    and resend, at most `max_retries` times
//! 4. parse the body, failing with [`MarketDataError::MalformedResponse`]
//!    when required fields are missing

mod endpoints;
mod parse;


pub use endpoints::{date_windows, EQUITY_MASTER, HISTORICAL_EQUITY, QUOTE_EQUITY, STOCK_INDICES};

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::classify::{classify, Verdict};
use crate::config::ClientConfig;
use crate::errors::MarketDataError;
use crate::models::{normalize_bars, HistoricalBar, Index, IndexSnapshot, Quote, StockRef};
use crate::session::{Handshake, Session, SessionManager, SessionSource};
use crate::transport::{HttpTransport, Transport, UpstreamRequest, UpstreamResponse};

/// Client for index catalogues, constituents, live quotes and daily history.
///
/// Each client owns its own session; clones of the client are not provided,
/// share it behind an `Arc` instead. All methods may run concurrently.
pub struct NseClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    sessions: SessionManager,
}

impl NseClient {
    /// Create a client over HTTPS with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, MarketDataError> {
        config.validate()?;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport)
    }

    /// Create a client from environment overrides (`NSE_*`).
    pub fn from_env() -> Result<Self, MarketDataError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client whose handshake and data requests share `transport`.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, MarketDataError> {
        let source: Arc<dyn SessionSource> =
            Arc::new(Handshake::new(transport.clone(), config.clone()));
        Self::with_parts(config, transport, source)
    }

    /// Create a client with an explicit session source.
    ///
    /// Fails with [`MarketDataError::InvalidConfig`] if `config` does not validate.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        source: Arc<dyn SessionSource>,
    ) -> Result<Self, MarketDataError> {
        config.validate()?;
        let sessions = SessionManager::new(source, &config);
        Ok(Self {
            config,
            transport,
            sessions,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session manager owned by this client.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// List every index in the catalogue, in upstream order.
    pub async fn list_indices(&self) -> Result<Vec<Index>, MarketDataError> {
        let body = self
            .fetch(EQUITY_MASTER, EQUITY_MASTER)
            .await?
            .ok_or_else(|| MarketDataError::malformed(EQUITY_MASTER, "catalogue not found"))?;

        let indices = parse::parse_index_catalogue(&body)?;
        info!("Fetched {} indices", indices.len());
        Ok(indices)
    }

    /// List the member stocks of `index`.
    pub async fn list_stocks(&self, index: &Index) -> Result<Vec<StockRef>, MarketDataError> {
        let body = self.fetch_index_board(index).await?;
        let stocks = parse::parse_constituents(&body, index.code())?;
        debug!("Index {} has {} constituents", index.code(), stocks.len());
        Ok(stocks)
    }

    /// Fetch the price board of `index`: one row per constituent plus the
    /// index's own row.
    pub async fn index_snapshot(&self, index: &Index) -> Result<IndexSnapshot, MarketDataError> {
        let body = self.fetch_index_board(index).await?;
        parse::parse_index_snapshot(&body, index.code())
    }

    /// Fetch the latest quote for `symbol`.
    pub async fn get_live(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;

        let body = self
            .fetch(&endpoints::quote_path(&symbol), QUOTE_EQUITY)
            .await?
            .ok_or_else(|| MarketDataError::UnknownSymbol(symbol.clone()))?;

        parse::parse_quote(&body, &symbol)
    }

    /// Fetch daily bars for `symbol` over the inclusive range `[start, end]`.
    ///
    /// Bars are returned strictly ascending by date. A range with no trading
    /// days yields an empty list. Ranges longer than `historical_window_days`
    /// are fetched as consecutive windows.
    pub async fn get_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalBar>, MarketDataError> {
        if start > end {
            return Err(MarketDataError::InvalidRange { start, end });
        }
        let symbol = normalize_symbol(symbol)?;

        let windows = date_windows(start, end, self.config.historical_window_days);
        let mut bars = Vec::new();

        for (from, to) in windows {
            let path = endpoints::historical_path(&symbol, from, to);
            let body = self
                .fetch(&path, HISTORICAL_EQUITY)
                .await?
                .ok_or_else(|| MarketDataError::UnknownSymbol(symbol.clone()))?;

            let window_bars = parse::parse_historical(&body, &symbol)?;
            debug!(
                "Fetched {} bars for {} between {} and {}",
                window_bars.len(),
                symbol,
                from,
                to
            );
            bars.extend(window_bars);
        }

        Ok(normalize_bars(bars, start, end))
    }

    // ========================================================================
    // Request Protocol
    // ========================================================================

    async fn fetch_index_board(&self, index: &Index) -> Result<String, MarketDataError> {
        if index.code().is_empty() {
            return Err(MarketDataError::UnknownIndex(String::new()));
        }

        self.fetch(&endpoints::stock_indices_path(index.code()), STOCK_INDICES)
            .await?
            .ok_or_else(|| MarketDataError::UnknownIndex(index.code().to_string()))
    }

    /// Send one GET with the retry-on-block loop.
    ///
    /// Returns `Ok(None)` when upstream answers 404 so the caller can raise
    /// its own unknown-entity error.
    async fn fetch(
        &self,
        path_and_query: &str,
        endpoint: &'static str,
    ) -> Result<Option<String>, MarketDataError> {
        let mut session = self.sessions.current().await?;
        let mut refreshes = 0;

        loop {
            let response = self.send_once(path_and_query, endpoint, &session).await?;

            match classify(&response) {
                Verdict::Ok => return Ok(Some(response.body)),
                Verdict::NotFound => return Ok(None),
                Verdict::Unavailable(reason) => {
                    warn!("{} unavailable: {}", endpoint, reason);
                    return Err(MarketDataError::Connectivity {
                        message: format!("{} unavailable: {}", endpoint, reason),
                    });
                }
                Verdict::Malformed(reason) => {
                    return Err(MarketDataError::malformed(endpoint, reason));
                }
                Verdict::Blocked(reason) => {
                    if refreshes >= self.config.max_retries {
                        warn!(
                            "{} still blocked after {} session refresh(es): {}",
                            endpoint, refreshes, reason
                        );
                        return Err(MarketDataError::UpstreamBlocked {
                            status: response.status,
                            reason,
                        });
                    }

                    refreshes += 1;
                    info!(
                        "{} blocked ({}), refreshing session (attempt {}/{})",
                        endpoint, reason, refreshes, self.config.max_retries
                    );
                    session = self.sessions.refresh(&session).await?;
                }
            }
        }
    }

    /// One attempt, bounded by the configured timeout.
    async fn send_once(
        &self,
        path_and_query: &str,
        endpoint: &'static str,
        session: &Session,
    ) -> Result<UpstreamResponse, MarketDataError> {
        let request = UpstreamRequest {
            url: self.config.url_for(path_and_query),
            endpoint,
            headers: session.request_headers(),
        };

        match tokio::time::timeout(self.config.timeout(), self.transport.get(&request)).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Connectivity {
                message: format!(
                    "{} timed out after {:.1}s",
                    endpoint, self.config.timeout_seconds
                ),
            }),
        }
    }
}

/// Trim and upper-case a ticker; a blank ticker is never sent upstream.
fn normalize_symbol(symbol: &str) -> Result<String, MarketDataError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(MarketDataError::UnknownSymbol(symbol.to_string()));
    }
    Ok(symbol.to_uppercase())
}
