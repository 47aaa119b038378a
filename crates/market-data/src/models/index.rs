//! Index catalogue and index membership models.

use serde::{Deserialize, Serialize};

/// A market index listed by the exchange (e.g., "NIFTY 50").
///
/// Immutable once constructed. The `code` is the key upstream expects when
/// querying constituents, which is the upper-cased display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    name: String,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

impl Index {
    /// Create an index from its display name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        let code = name.to_uppercase();
        Self {
            name,
            code,
            category: None,
        }
    }

    /// Attach the catalogue group the index was listed under.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Display name as listed upstream.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query key used for constituent lookups.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Catalogue group (e.g., "Broad Market Indices"), if known.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Membership of a stock in an index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRef {
    /// Exchange ticker (e.g., "RELIANCE")
    pub symbol: String,

    /// Code of the index this stock was listed under
    pub index_code: String,

    /// Company name, when upstream provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}
