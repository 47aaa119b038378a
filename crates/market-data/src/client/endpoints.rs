//! Upstream endpoint paths and query construction.

use chrono::{Days, NaiveDate};
use urlencoding::encode;

/// Index catalogue, grouped by category.
pub const EQUITY_MASTER: &str = "/api/equity-master";

/// Constituents and price board of one index.
pub const STOCK_INDICES: &str = "/api/equity-stockIndices";

/// Live quote for one equity.
pub const QUOTE_EQUITY: &str = "/api/quote-equity";

/// Daily history for one equity, served as CSV.
pub const HISTORICAL_EQUITY: &str = "/api/historical/cm/equity";

/// Only the regular equity series is requested.
const HISTORICAL_SERIES: &str = r#"["EQ"]"#;

/// Date format the historical endpoint expects in `from`/`to`.
const QUERY_DATE_FORMAT: &str = "%d-%m-%Y";

pub fn stock_indices_path(index_code: &str) -> String {
    format!("{}?index={}", STOCK_INDICES, encode(index_code))
}

pub fn quote_path(symbol: &str) -> String {
    format!("{}?symbol={}", QUOTE_EQUITY, encode(symbol))
}

pub fn historical_path(symbol: &str, from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "{}?symbol={}&series={}&from={}&to={}&csv=true",
        HISTORICAL_EQUITY,
        encode(symbol),
        encode(HISTORICAL_SERIES),
        from.format(QUERY_DATE_FORMAT),
        to.format(QUERY_DATE_FORMAT)
    )
}

/// Split `[start, end]` into consecutive inclusive windows of at most
/// `window_days` days. Returns no windows when `start > end`.
pub fn date_windows(start: NaiveDate, end: NaiveDate, window_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let span = u64::from(window_days.max(1)) - 1;
    let mut windows = Vec::new();
    let mut cursor = start;

    while cursor <= end {
        let window_end = cursor
            .checked_add_days(Days::new(span))
            .map_or(end, |d| d.min(end));
        windows.push((cursor, window_end));

        match window_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }

    windows
}
