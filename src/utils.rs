pub mod deduplication;

use crate::constants::{
    DATE_FORMAT, DEFAULT_CORS_ORIGINS, DEFAULT_DATA_DIR, DEFAULT_YAHOO_BASE_URL,
    DEFAULT_YAHOO_TIMEOUT_SECS,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

/// Get stock cache directory from environment variable or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var("STOCK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Get allowed CORS origins from environment variable (comma separated)
pub fn get_cors_origins() -> Vec<String> {
    let raw = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string());
    raw.split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

/// Get Yahoo Finance base URL from environment variable or use default
pub fn get_yahoo_base_url() -> String {
    std::env::var("YAHOO_BASE_URL").unwrap_or_else(|_| DEFAULT_YAHOO_BASE_URL.to_string())
}

/// Get provider request timeout from environment variable or use default
pub fn get_yahoo_timeout() -> Duration {
    let secs = std::env::var("YAHOO_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_YAHOO_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Parse a YYYY-MM-DD date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Format date as YYYY-MM-DD
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
