use crate::error::{AppError, Result};
use crate::models::PriceBar;
use crate::services::provider::PriceProvider;
use crate::utils::{get_yahoo_base_url, get_yahoo_timeout};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    /// Absent when the range holds no trading days
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Client for the Yahoo Finance chart API (daily bars only)
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    /// Create a client from STOCK_* / YAHOO_* environment configuration
    pub fn from_env() -> Result<Self> {
        Self::new(get_yahoo_base_url(), get_yahoo_timeout())
    }

    /// Create a client against a specific base URL
    ///
    /// # Arguments
    /// * `base_url` - e.g. "https://query1.finance.yahoo.com"
    /// * `timeout` - per-request timeout
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created YahooClient: base_url='{}', timeout={:?}", base_url, timeout);

        Ok(Self { base_url, client })
    }

    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div%2Csplit&includeAdjustedClose=true",
            self.base_url,
            ticker,
            midnight_timestamp(start),
            midnight_timestamp(end)
        )
    }
}

#[async_trait]
impl PriceProvider for YahooClient {
    async fn fetch_history(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        if start >= end {
            return Ok(Vec::new());
        }

        let url = self.chart_url(ticker, start, end);
        debug!(ticker, %start, %end, url, "Fetching daily history");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Yahoo request failed for {}: {}", ticker, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(ticker, "Yahoo does not know this symbol");
            return Ok(Vec::new());
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Network(format!(
                "Yahoo returned error status {}: {}",
                status, body
            )));
        }

        let bars = parse_chart_response(&body, start, end)?;
        info!(ticker, %start, %end, records = bars.len(), "Fetched daily history");
        Ok(bars)
    }
}

/// Unix timestamp of 00:00 UTC on the given day
fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Parse a chart API body into daily bars within `[start, end)`
///
/// Rows with any missing OHLC value are skipped; a missing adjusted close
/// falls back to the close.
fn parse_chart_response(body: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Parse(format!("Failed to parse Yahoo chart response: {}", e)))?;

    if let Some(error) = response.chart.error {
        if error.code == "Not Found" {
            return Ok(Vec::new());
        }
        return Err(AppError::Network(format!(
            "Yahoo API error: {} - {}",
            error.code, error.description
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let gmt_offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adj_close = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next())
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        // Timestamps mark the exchange open; shift to exchange-local time before taking the date
        let Some(date) = DateTime::from_timestamp(ts + gmt_offset, 0).map(|t| t.date_naive()) else {
            warn!(ts, "Skipping bar with out-of-range timestamp");
            continue;
        };
        if date < start || date >= end {
            continue;
        }

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();

        if let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) {
            let adj = adj_close.get(i).copied().flatten().unwrap_or(close);
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);
            bars.push(PriceBar::new(date, open, high, low, close, adj, volume));
        } else {
            debug!(%date, "Skipping bar with missing prices");
        }
    }

    bars.sort_by_key(|bar| bar.date);
    Ok(bars)
}
