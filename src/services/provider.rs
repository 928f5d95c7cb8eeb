//! Market-data provider abstraction
//!
//! The cache layer only needs two things from a provider: daily history for
//! a half-open date range, and a cheap existence probe for a ticker.

use crate::constants::TICKER_PROBE_DAYS;
use crate::error::Result;
use crate::models::PriceBar;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily bars for `[start, end)`, ascending by date
    ///
    /// Unknown tickers yield an empty vector rather than an error.
    async fn fetch_history(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>>;

    /// Whether the provider has any data for the ticker in the last week
    async fn has_recent_history(&self, ticker: &str) -> Result<bool> {
        let end = Utc::now().date_naive() + Duration::days(1);
        let start = end - Duration::days(TICKER_PROBE_DAYS + 1);
        let bars = self.fetch_history(ticker, start, end).await?;
        Ok(!bars.is_empty())
    }
}

pub type SharedProvider = Arc<dyn PriceProvider>;
