//! Per-constituent price rows for a whole index.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price board for every constituent of one index, as of `last_updated`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Code of the index the rows belong to
    pub index_code: String,

    /// Upstream update time, verbatim (e.g., "17-Oct-2025 16:00:00")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Rows in source order; the index's own row comes first and has no company name
    pub rows: Vec<ConstituentSnapshot>,
}

/// One row of an [`IndexSnapshot`].
///
/// Only `symbol` and `last_price` are required; every other figure is
/// optional because upstream omits them for some rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstituentSnapshot {
    pub symbol: String,
    pub company_name: Option<String>,
    pub open: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub last_price: Decimal,
    pub previous_close: Option<Decimal>,
    pub change: Option<Decimal>,
    pub percent_change: Option<Decimal>,
    pub year_high: Option<Decimal>,
    pub year_low: Option<Decimal>,
    pub total_traded_volume: Option<u64>,
    pub total_traded_value: Option<Decimal>,
    pub per_change_365d: Option<Decimal>,
    pub per_change_30d: Option<Decimal>,
}

impl IndexSnapshot {
    /// Rows for member stocks only, skipping the index's own row.
    pub fn constituents(&self) -> impl Iterator<Item = &ConstituentSnapshot> {
        self.rows
            .iter()
            .filter(move |row| !row.symbol.eq_ignore_ascii_case(&self.index_code))
    }
}
