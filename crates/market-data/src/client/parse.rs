//! Tolerant mapping from upstream payloads into record types.
//!
//! Wire structs accept any additional fields and model every upstream value
//! as optional. Numbers are read through [`decimal_of`]/[`count_of`] because
//! upstream mixes JSON numbers, numeric strings with thousands separators,
//! and `"-"` placeholders. Mapping fails only when a required field is
//! missing or unreadable.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use csv::{ReaderBuilder, StringRecord, Trim};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::endpoints::{EQUITY_MASTER, HISTORICAL_EQUITY, QUOTE_EQUITY, STOCK_INDICES};
use crate::errors::MarketDataError;
use crate::models::{ConstituentSnapshot, HistoricalBar, Index, IndexSnapshot, Quote, StockRef};

/// Format of upstream update times, e.g. "17-Oct-2025 16:00:00".
const EXCHANGE_TIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// Format of dates in historical CSV rows, e.g. "17-Oct-2025".
const CSV_DATE_FORMAT: &str = "%d-%b-%Y";

// ============================================================================
// Wire Models
// ============================================================================

/// Response from the index constituents endpoint
#[derive(Debug, Deserialize)]
struct IndexBoardResponse {
    #[serde(default)]
    data: Option<Vec<IndexBoardRow>>,
    timestamp: Option<String>,
}

/// One row of the index board; the first row describes the index itself
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexBoardRow {
    symbol: Option<String>,
    meta: Option<RowMeta>,
    open: Option<Value>,
    day_high: Option<Value>,
    day_low: Option<Value>,
    last_price: Option<Value>,
    previous_close: Option<Value>,
    change: Option<Value>,
    p_change: Option<Value>,
    year_high: Option<Value>,
    year_low: Option<Value>,
    total_traded_volume: Option<Value>,
    total_traded_value: Option<Value>,
    #[serde(rename = "perChange365d")]
    per_change_365d: Option<Value>,
    #[serde(rename = "perChange30d")]
    per_change_30d: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowMeta {
    company_name: Option<String>,
}

/// Response from the quote endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEquityResponse {
    info: Option<QuoteInfo>,
    metadata: Option<QuoteMetadata>,
    price_info: Option<PriceInfo>,
    pre_open_market: Option<PreOpenMarket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteInfo {
    symbol: Option<String>,
    company_name: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteMetadata {
    last_update_time: Option<String>,
    industry: Option<String>,
    listing_date: Option<String>,
    // Note: series, status exist but are not mapped
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceInfo {
    last_price: Option<Value>,
    change: Option<Value>,
    p_change: Option<Value>,
    open: Option<Value>,
    previous_close: Option<Value>,
    intra_day_high_low: Option<HighLow>,
    week_high_low: Option<HighLow>,
}

/// Range with `min`/`max`; the 52-week range also dates its extremes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HighLow {
    min: Option<Value>,
    max: Option<Value>,
    min_date: Option<String>,
    max_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreOpenMarket {
    total_traded_volume: Option<Value>,
    total_buy_quantity: Option<Value>,
    total_sell_quantity: Option<Value>,
}

/// JSON sent by the historical endpoint instead of CSV when it has no rows
/// or rejects the request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoricalMessage {
    show_message: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    data: Option<Vec<Value>>,
}

impl HistoricalMessage {
    /// First message key present, in order of preference.
    fn text(self) -> Option<String> {
        self.show_message.or(self.message).or(self.msg)
    }
}

// ============================================================================
// Index Catalogue
// ============================================================================

/// Map the catalogue (`{category: [index name, ...], ...}`) into indices,
/// preserving source order. Non-string entries are skipped.
pub fn parse_index_catalogue(body: &str) -> Result<Vec<Index>, MarketDataError> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| MarketDataError::malformed(EQUITY_MASTER, format!("invalid JSON: {}", e)))?;

    let categories = document.as_object().ok_or_else(|| {
        MarketDataError::malformed(EQUITY_MASTER, "expected an object of categories")
    })?;

    let mut indices = Vec::new();
    for (category, names) in categories {
        let Some(names) = names.as_array() else {
            debug!("Skipping non-list catalogue category '{}'", category);
            continue;
        };
        indices.extend(
            names
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .map(|name| Index::new(name).with_category(category.as_str())),
        );
    }

    Ok(indices)
}

// ============================================================================
// Index Board
// ============================================================================

fn parse_index_board(body: &str, index_code: &str) -> Result<IndexBoardResponse, MarketDataError> {
    let response: IndexBoardResponse = serde_json::from_str(body)
        .map_err(|e| MarketDataError::malformed(STOCK_INDICES, format!("invalid JSON: {}", e)))?;

    match &response.data {
        Some(rows) if !rows.is_empty() => Ok(response),
        _ => Err(MarketDataError::UnknownIndex(index_code.to_string())),
    }
}

fn required_symbol(row: &IndexBoardRow, position: usize) -> Result<String, MarketDataError> {
    row.symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            MarketDataError::malformed(STOCK_INDICES, format!("row {} has no symbol", position))
        })
}

/// Map the index board into member stocks, excluding the index's own row.
pub fn parse_constituents(body: &str, index_code: &str) -> Result<Vec<StockRef>, MarketDataError> {
    let board = parse_index_board(body, index_code)?;
    let rows = board.data.unwrap_or_default();

    let mut stocks = Vec::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        let symbol = required_symbol(row, position)?;
        if symbol.eq_ignore_ascii_case(index_code) {
            continue;
        }
        stocks.push(StockRef {
            symbol,
            index_code: index_code.to_string(),
            company_name: row.meta.as_ref().and_then(|m| m.company_name.clone()),
        });
    }

    Ok(stocks)
}

/// Map the index board into a full price snapshot.
pub fn parse_index_snapshot(body: &str, index_code: &str) -> Result<IndexSnapshot, MarketDataError> {
    let board = parse_index_board(body, index_code)?;
    let rows = board.data.unwrap_or_default();

    let mut snapshot_rows = Vec::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        let symbol = required_symbol(row, position)?;
        let last_price = row.last_price.as_ref().and_then(decimal_of).ok_or_else(|| {
            MarketDataError::malformed(
                STOCK_INDICES,
                format!("row {} ({}) has no lastPrice", position, symbol),
            )
        })?;

        snapshot_rows.push(ConstituentSnapshot {
            company_name: row.meta.as_ref().and_then(|m| m.company_name.clone()),
            open: row.open.as_ref().and_then(decimal_of),
            day_high: row.day_high.as_ref().and_then(decimal_of),
            day_low: row.day_low.as_ref().and_then(decimal_of),
            last_price,
            previous_close: row.previous_close.as_ref().and_then(decimal_of),
            change: row.change.as_ref().and_then(decimal_of),
            percent_change: row.p_change.as_ref().and_then(decimal_of),
            year_high: row.year_high.as_ref().and_then(decimal_of),
            year_low: row.year_low.as_ref().and_then(decimal_of),
            total_traded_volume: row.total_traded_volume.as_ref().and_then(count_of),
            total_traded_value: row.total_traded_value.as_ref().and_then(decimal_of),
            per_change_365d: row.per_change_365d.as_ref().and_then(decimal_of),
            per_change_30d: row.per_change_30d.as_ref().and_then(decimal_of),
            symbol,
        });
    }

    Ok(IndexSnapshot {
        index_code: index_code.to_string(),
        last_updated: board.timestamp,
        rows: snapshot_rows,
    })
}

// ============================================================================
// Live Quote
// ============================================================================

/// Map a quote payload. A payload without `info` means the symbol is unknown.
pub fn parse_quote(body: &str, requested_symbol: &str) -> Result<Quote, MarketDataError> {
    let response: QuoteEquityResponse = serde_json::from_str(body)
        .map_err(|e| MarketDataError::malformed(QUOTE_EQUITY, format!("invalid JSON: {}", e)))?;

    let info = response
        .info
        .ok_or_else(|| MarketDataError::UnknownSymbol(requested_symbol.to_string()))?;

    let price_info = response
        .price_info
        .ok_or_else(|| MarketDataError::malformed(QUOTE_EQUITY, "missing priceInfo"))?;

    let price = required_decimal(price_info.last_price.as_ref(), "priceInfo.lastPrice")?;
    let change = required_decimal(price_info.change.as_ref(), "priceInfo.change")?.round_dp(2);
    let percent_change =
        required_decimal(price_info.p_change.as_ref(), "priceInfo.pChange")?.round_dp(2);

    let metadata = response.metadata;
    let timestamp = metadata
        .as_ref()
        .and_then(|m| m.last_update_time.as_deref())
        .and_then(parse_exchange_time)
        .unwrap_or_else(|| {
            debug!("No usable update time for {}, using now", requested_symbol);
            Utc::now()
        });

    let symbol = info
        .symbol
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| requested_symbol.to_string());

    let (high, low) = high_low(price_info.intra_day_high_low.as_ref());
    let (week_52_high, week_52_low) = high_low(price_info.week_high_low.as_ref());
    let week_range = price_info.week_high_low.as_ref();
    let pre_open = response.pre_open_market.as_ref();
    let listing_date = metadata
        .as_ref()
        .and_then(|m| m.listing_date.as_deref())
        .and_then(parse_csv_date);

    Ok(Quote {
        symbol,
        price,
        change,
        percent_change,
        volume: pre_open
            .and_then(|p| p.total_traded_volume.as_ref())
            .and_then(count_of),
        timestamp,
        company_name: info.company_name,
        industry: info
            .industry
            .or_else(|| metadata.and_then(|m| m.industry)),
        open: price_info.open.as_ref().and_then(decimal_of),
        high,
        low,
        previous_close: price_info.previous_close.as_ref().and_then(decimal_of),
        week_52_high,
        week_52_low,
        week_52_high_date: week_range
            .and_then(|r| r.max_date.as_deref())
            .and_then(parse_csv_date),
        week_52_low_date: week_range
            .and_then(|r| r.min_date.as_deref())
            .and_then(parse_csv_date),
        listing_date,
        total_buy_quantity: pre_open
            .and_then(|p| p.total_buy_quantity.as_ref())
            .and_then(count_of),
        total_sell_quantity: pre_open
            .and_then(|p| p.total_sell_quantity.as_ref())
            .and_then(count_of),
    })
}

fn required_decimal(value: Option<&Value>, field: &str) -> Result<Decimal, MarketDataError> {
    value
        .and_then(decimal_of)
        .ok_or_else(|| MarketDataError::malformed(QUOTE_EQUITY, format!("missing {}", field)))
}

fn high_low(range: Option<&HighLow>) -> (Option<Decimal>, Option<Decimal>) {
    match range {
        Some(range) => (
            range.max.as_ref().and_then(decimal_of),
            range.min.as_ref().and_then(decimal_of),
        ),
        None => (None, None),
    }
}

/// Parse an exchange-local update time into UTC.
pub fn parse_exchange_time(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), EXCHANGE_TIME_FORMAT).ok()?;
    Kolkata
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Historical CSV
// ============================================================================

/// Column positions located from the CSV header row.
struct HistoricalColumns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    previous_close: Option<usize>,
    vwap: Option<usize>,
    trades: Option<usize>,
    series: Option<usize>,
    last_traded_price: Option<usize>,
    week_52_high: Option<usize>,
    week_52_low: Option<usize>,
    traded_value: Option<usize>,
}

impl HistoricalColumns {
    fn locate(headers: &StringRecord) -> Result<Self, MarketDataError> {
        let names: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| {
                MarketDataError::malformed(
                    HISTORICAL_EQUITY,
                    format!("missing column '{}' in {:?}", aliases[0], names),
                )
            })
        };

        Ok(Self {
            date: require(&["date"])?,
            open: require(&["open", "open price"])?,
            high: require(&["high", "high price"])?,
            low: require(&["low", "low price"])?,
            close: require(&["close", "close price"])?,
            volume: require(&["volume", "total traded quantity"])?,
            previous_close: find(&["prev. close", "prev close"]),
            vwap: find(&["vwap"]),
            trades: find(&["no of trades", "no. of trades"]),
            series: find(&["series"]),
            last_traded_price: find(&["ltp", "last traded price"]),
            week_52_high: find(&["52w h", "52 week high price"]),
            week_52_low: find(&["52w l", "52 week low price"]),
            traded_value: find(&["value", "total traded value"]),
        })
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Map a historical payload into bars for `symbol`, in source order.
///
/// A header-only CSV, or a JSON message saying no records exist, is an
/// empty result rather than an error.
pub fn parse_historical(body: &str, symbol: &str) -> Result<Vec<HistoricalBar>, MarketDataError> {
    let trimmed = body.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('{') {
        return parse_historical_message(trimmed);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(trimmed.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| MarketDataError::malformed(HISTORICAL_EQUITY, format!("bad CSV header: {}", e)))?
        .clone();
    let columns = HistoricalColumns::locate(&headers)?;

    let mut bars = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            MarketDataError::malformed(HISTORICAL_EQUITY, format!("bad CSV row {}: {}", line + 1, e))
        })?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        bars.push(parse_bar_record(&record, &columns, symbol, line + 1)?);
    }

    Ok(bars)
}

fn parse_bar_record(
    record: &StringRecord,
    columns: &HistoricalColumns,
    symbol: &str,
    line: usize,
) -> Result<HistoricalBar, MarketDataError> {
    let field = |index: usize| record.get(index).unwrap_or("");
    let bad = |name: &str, value: &str| {
        MarketDataError::malformed(
            HISTORICAL_EQUITY,
            format!("row {}: unreadable {} '{}'", line, name, value),
        )
    };
    let price = |index: usize, name: &str| {
        let value = field(index);
        parse_decimal_str(value).ok_or_else(|| bad(name, value))
    };

    let raw_date = field(columns.date);
    let date = parse_csv_date(raw_date).ok_or_else(|| bad("date", raw_date))?;
    let raw_volume = field(columns.volume);
    let volume = parse_count_str(raw_volume).ok_or_else(|| bad("volume", raw_volume))?;

    Ok(HistoricalBar {
        symbol: symbol.to_string(),
        date,
        open: price(columns.open, "open")?,
        high: price(columns.high, "high")?,
        low: price(columns.low, "low")?,
        close: price(columns.close, "close")?,
        volume,
        previous_close: columns.previous_close.and_then(|i| parse_decimal_str(field(i))),
        vwap: columns.vwap.and_then(|i| parse_decimal_str(field(i))),
        trades: columns.trades.and_then(|i| parse_count_str(field(i))),
        series: columns
            .series
            .map(field)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        last_traded_price: columns.last_traded_price.and_then(|i| parse_decimal_str(field(i))),
        week_52_high: columns.week_52_high.and_then(|i| parse_decimal_str(field(i))),
        week_52_low: columns.week_52_low.and_then(|i| parse_decimal_str(field(i))),
        traded_value: columns.traded_value.and_then(|i| parse_decimal_str(field(i))),
    })
}

fn parse_csv_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, CSV_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

fn parse_historical_message(body: &str) -> Result<Vec<HistoricalBar>, MarketDataError> {
    let message: HistoricalMessage = serde_json::from_str(body).map_err(|e| {
        MarketDataError::malformed(HISTORICAL_EQUITY, format!("invalid JSON: {}", e))
    })?;

    if matches!(&message.data, Some(rows) if rows.is_empty()) {
        return Ok(Vec::new());
    }

    match message.text() {
        Some(text) if text.to_lowercase().contains("no record") => {
            debug!("Historical endpoint reported no records: {}", text);
            Ok(Vec::new())
        }
        Some(text) => Err(MarketDataError::malformed(HISTORICAL_EQUITY, text)),
        None => Err(MarketDataError::malformed(
            HISTORICAL_EQUITY,
            "expected CSV, got a JSON document",
        )),
    }
}

// ============================================================================
// Number Helpers
// ============================================================================

/// Read a decimal from a JSON number or numeric string.
pub fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

/// Read a non-negative whole count from a JSON number or numeric string.
pub fn count_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => parse_count_str(s),
        _ => None,
    }
}

fn parse_decimal_str(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn parse_count_str(raw: &str) -> Option<u64> {
    let value = parse_decimal_str(raw)?;
    if value.is_sign_negative() {
        return None;
    }
    num_traits::ToPrimitive::to_u64(&value.round())
}
