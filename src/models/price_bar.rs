use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar as stored in a cache file and returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading day (serialized as YYYY-MM-DD)
    pub date: NaiveDate,

    /// Opening price
    pub open: f64,

    /// Highest price
    pub high: f64,

    /// Lowest price
    pub low: f64,

    /// Closing price
    pub close: f64,

    /// Close adjusted for splits and dividends
    pub adj_close: f64,

    /// Trading volume
    pub volume: u64,
}

impl PriceBar {
    /// Create a new daily bar
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        adj_close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_uses_plain_dates() {
        let bar = PriceBar::new(
            NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            177.83,
            182.88,
            177.71,
            182.01,
            179.95,
            104_487_900,
        );

        let json = serde_json::to_value(&bar).unwrap();
        assert_eq!(json["date"], "2022-01-03");
        assert_eq!(json["volume"], 104_487_900);
        assert_eq!(json["adj_close"], 179.95);
    }
}
