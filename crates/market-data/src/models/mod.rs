//! Market data models
//!
//! This module contains the record types returned by the client:
//! - `index` - Index catalogue entries (Index) and index membership (StockRef)
//! - `quote` - Live quote snapshots (Quote)
//! - `bar` - Daily OHLCV history (HistoricalBar)
//! - `snapshot` - Whole-index price boards (IndexSnapshot, ConstituentSnapshot)

mod bar;
mod index;
mod quote;
mod snapshot;

pub use bar::{normalize_bars, HistoricalBar};
pub use index::{Index, StockRef};
pub use quote::Quote;
pub use snapshot::{ConstituentSnapshot, IndexSnapshot};
