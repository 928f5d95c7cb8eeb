use super::PriceBar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// JSON view of a tracked stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    /// First day covered by the backing cache file
    pub start_date: NaiveDate,
    /// Exclusive end of the backing cache file
    pub end_date: NaiveDate,
    pub data: Vec<PriceBar>,
}

/// Body of POST /stocks
///
/// Dates stay strings here so format errors surface as validation messages
/// instead of extractor rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct AddStockRequest {
    /// The stock ticker symbol, e.g. AAPL
    pub ticker: String,
    /// Start date in YYYY-MM-DD format
    pub start_date: String,
    /// End date in YYYY-MM-DD format
    pub end_date: String,
}
