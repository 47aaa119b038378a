use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV data for a symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,

    /// Previous session's close (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,

    /// Volume-weighted average price (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vwap: Option<Decimal>,

    /// Number of trades (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trades: Option<u64>,

    /// Trading series, e.g. "EQ" (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    /// Last traded price of the session (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_traded_price: Option<Decimal>,

    /// 52-week high as of this session (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_high: Option<Decimal>,

    /// 52-week low as of this session (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_low: Option<Decimal>,

    /// Traded value in rupees (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traded_value: Option<Decimal>,
}

/// Restrict bars to `[start, end]` and order them strictly ascending by date.
///
/// When upstream repeats a date (overlapping windows), the first occurrence wins.
pub fn normalize_bars(
    mut bars: Vec<HistoricalBar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<HistoricalBar> {
    bars.retain(|bar| bar.date >= start && bar.date <= end);
    // Stable sort keeps the first occurrence ahead of its duplicates
    bars.sort_by_key(|bar| bar.date);
    bars.dedup_by_key(|bar| bar.date);
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(date: NaiveDate, close: Decimal) -> HistoricalBar {
        HistoricalBar {
            symbol: "TCS".to_string(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
            previous_close: None,
            vwap: None,
            trades: None,
            series: None,
            last_traded_price: None,
            week_52_high: None,
            week_52_low: None,
            traded_value: None,
        }
    }

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_normalize_sorts_filters_and_dedups() {
        let bars = vec![
            bar(d(2024, 1, 5), dec!(5)),
            bar(d(2023, 12, 29), dec!(0)),
            bar(d(2024, 1, 3), dec!(3)),
            bar(d(2024, 1, 4), dec!(4)),
            bar(d(2024, 1, 3), dec!(33)),
            bar(d(2024, 1, 10), dec!(10)),
        ];

        let result = normalize_bars(bars, d(2024, 1, 1), d(2024, 1, 5));

        let dates: Vec<NaiveDate> = result.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 3), d(2024, 1, 4), d(2024, 1, 5)]);
        assert_eq!(result[0].close, dec!(3));
    }

    #[test]
    fn test_normalize_empty_is_empty() {
        assert!(normalize_bars(Vec::new(), d(2024, 1, 1), d(2024, 1, 5)).is_empty());
    }
}
