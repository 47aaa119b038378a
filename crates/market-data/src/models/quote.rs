use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time price snapshot for one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Exchange ticker
    pub symbol: String,

    /// Last traded price
    pub price: Decimal,

    /// Absolute change against previous close, rounded to 2 places
    pub change: Decimal,

    /// Percentage change against previous close, rounded to 2 places
    pub percent_change: Decimal,

    /// Total traded volume (optional, absent before the session opens)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    /// Upstream update time
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Opening price (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Intraday high (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Intraday low (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,

    /// 52-week high (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_high: Option<Decimal>,

    /// 52-week low (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_low: Option<Decimal>,

    /// Date the 52-week high was set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_high_date: Option<NaiveDate>,

    /// Date the 52-week low was set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_low_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_date: Option<NaiveDate>,

    /// Pre-open order book buy quantity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_buy_quantity: Option<u64>,

    /// Pre-open order book sell quantity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sell_quantity: Option<u64>,
}

impl Quote {
    /// Create a new quote with minimal required fields
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        change: Decimal,
        percent_change: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change,
            percent_change,
            volume: None,
            timestamp,
            company_name: None,
            industry: None,
            open: None,
            high: None,
            low: None,
            previous_close: None,
            week_52_high: None,
            week_52_low: None,
            week_52_high_date: None,
            week_52_low_date: None,
            listing_date: None,
            total_buy_quantity: None,
            total_sell_quantity: None,
        }
    }
}
