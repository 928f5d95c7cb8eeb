use crate::error::{AppError, Result};
use crate::models::{PriceBar, StockSnapshot};
use crate::services::provider::SharedProvider;
use crate::services::stock::{normalize_ticker, Stock};
use crate::utils::parse_date;
use chrono::{NaiveDate, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// In-memory registry: ticker -> cached stock
pub struct StockRegistry {
    stocks: RwLock<HashMap<String, Stock>>,
    // Held for a whole update so two refreshes never rewrite the same file
    update_lock: Mutex<()>,
    provider: SharedProvider,
    data_dir: PathBuf,
}

// Shared registry for passing between handlers
pub type SharedRegistry = Arc<StockRegistry>;

impl StockRegistry {
    pub fn new(provider: SharedProvider, data_dir: PathBuf) -> Self {
        Self {
            stocks: RwLock::new(HashMap::new()),
            update_lock: Mutex::new(()),
            provider,
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// All tracked tickers, sorted
    pub async fn tickers(&self) -> Vec<String> {
        let stocks = self.stocks.read().await;
        let mut tickers: Vec<String> = stocks.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    pub async fn len(&self) -> usize {
        self.stocks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, ticker: &str) -> Result<StockSnapshot> {
        let ticker = normalize_ticker(ticker);
        let stocks = self.stocks.read().await;

        match stocks.get(&ticker) {
            Some(stock) => Ok(stock.snapshot()),
            None => Err(not_in_list(&ticker, &stocks)),
        }
    }

    /// Track a new stock, downloading or reusing its cache file
    ///
    /// The download happens without holding the lock; uniqueness is checked
    /// again on insert.
    pub async fn add(&self, ticker: &str, start_date: &str, end_date: &str) -> Result<StockSnapshot> {
        let ticker = normalize_ticker(ticker);

        if self.stocks.read().await.contains_key(&ticker) {
            return Err(already_exists(&ticker));
        }

        let stock = Stock::open(
            &ticker,
            start_date,
            end_date,
            self.provider.clone(),
            &self.data_dir,
        )
        .await?;

        let mut stocks = self.stocks.write().await;
        match stocks.entry(ticker) {
            Entry::Occupied(entry) => Err(already_exists(entry.key())),
            Entry::Vacant(entry) => {
                info!(ticker = %entry.key(), coverage = %stock.coverage(), "Stock added");
                let snapshot = stock.snapshot();
                entry.insert(stock);
                Ok(snapshot)
            }
        }
    }

    /// Extend a tracked stock up to today
    pub async fn update(&self, ticker: &str) -> Result<StockSnapshot> {
        self.update_to(ticker, Utc::now().date_naive()).await
    }

    /// Extend a tracked stock up to the given day
    ///
    /// The download runs on a copy of the entry, outside the map lock, and the
    /// result replaces the entry afterwards.
    pub async fn update_to(&self, ticker: &str, today: NaiveDate) -> Result<StockSnapshot> {
        let ticker = normalize_ticker(ticker);
        let _updating = self.update_lock.lock().await;

        let mut stock = {
            let stocks = self.stocks.read().await;
            stocks
                .get(&ticker)
                .cloned()
                .ok_or_else(|| not_in_list(&ticker, &stocks))?
        };

        stock.update(today).await?;

        let mut stocks = self.stocks.write().await;
        match stocks.get_mut(&ticker) {
            Some(entry) => {
                let snapshot = stock.snapshot();
                *entry = stock;
                Ok(snapshot)
            }
            // Deleted while downloading; the refreshed file stays on disk
            None => Err(not_in_list(&ticker, &stocks)),
        }
    }

    /// Stop tracking a stock; its cache file stays on disk for reuse
    ///
    /// Returns the normalized ticker that was removed.
    pub async fn delete(&self, ticker: &str) -> Result<String> {
        let ticker = normalize_ticker(ticker);
        let mut stocks = self.stocks.write().await;

        if stocks.remove(&ticker).is_some() {
            info!(ticker = %ticker, "Stock deleted");
            Ok(ticker)
        } else {
            Err(AppError::NotFound(format!(
                "Stock '{}' can't be deleted: choose from {:?}",
                ticker,
                sorted_keys(&stocks)
            )))
        }
    }

    /// Bar of a tracked stock for one day
    pub async fn day(&self, ticker: &str, date: &str) -> Result<PriceBar> {
        let ticker = normalize_ticker(ticker);
        let date = parse_date(date).ok_or_else(|| {
            AppError::InvalidInput("Date must be in 'YYYY-MM-DD' format.".to_string())
        })?;

        let stocks = self.stocks.read().await;
        let stock = stocks
            .get(&ticker)
            .ok_or_else(|| not_in_list(&ticker, &stocks))?;

        debug!(ticker = %ticker, %date, "Looking up single day");
        stock.bar_on(date).cloned().ok_or_else(|| {
            AppError::NotFound(format!("No data for stock '{}' on {}", ticker, date))
        })
    }
}

fn already_exists(ticker: &str) -> AppError {
    AppError::AlreadyExists(format!("Stock '{}' already exists.", ticker))
}

fn not_in_list(ticker: &str, stocks: &HashMap<String, Stock>) -> AppError {
    AppError::NotFound(format!(
        "Stock '{}' not in list, choose from {:?}",
        ticker,
        sorted_keys(stocks)
    ))
}

fn sorted_keys(stocks: &HashMap<String, Stock>) -> Vec<&str> {
    let mut keys: Vec<&str> = stocks.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::testing::FakeProvider;
    use std::time::Duration;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn registry(dir: &Path, known: &[&str]) -> (StockRegistry, Arc<FakeProvider>) {
        let provider = FakeProvider::shared(known);
        (StockRegistry::new(provider.clone(), dir.to_path_buf()), provider)
    }

    #[tokio::test]
    async fn test_add_get_and_list() {
        let dir = tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["AAPL", "MSFT"]);
        assert!(registry.is_empty().await);

        let snapshot = registry.add("MSFT", "2022-01-03", "2022-01-10").await.unwrap();
        assert_eq!(snapshot.ticker, "MSFT");
        registry.add("aapl", "2022-01-03", "2022-01-10").await.unwrap();

        assert_eq!(registry.tickers().await, vec!["AAPL", "MSFT"]);
        assert_eq!(registry.get("AAPL").await.unwrap().data.len(), 5);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_add_duplicate_rejected() {
        let dir = tempdir().unwrap();
        let (registry, provider) = registry(dir.path(), &["AAPL"]);

        registry.add("AAPL", "2022-01-03", "2022-01-10").await.unwrap();
        let err = registry.add("AAPL", "2021-01-01", "2021-06-01").await.unwrap_err();

        assert_eq!(err.to_string(), "Stock 'AAPL' already exists.");
        assert_eq!(provider.download_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_one_entry() {
        let dir = tempdir().unwrap();
        let (registry, provider) = registry(dir.path(), &["AAPL"]);
        provider.set_delay_ms(50);

        let (first, second) = tokio::join!(
            registry.add("AAPL", "2022-01-03", "2022-01-10"),
            registry.add("aapl", "2022-01-03", "2022-01-10"),
        );
        let results = [first, second];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::AlreadyExists(_)))));
        assert_eq!(registry.tickers().await, vec!["AAPL"]);
        // Both got past the early check, so the insert rejected one
        assert_eq!(provider.download_count(), 2);
    }

    #[tokio::test]
    async fn test_reads_proceed_while_update_downloads() {
        let dir = tempdir().unwrap();
        let (registry, provider) = registry(dir.path(), &["AAPL"]);
        let registry = Arc::new(registry);
        registry.add("AAPL", "2022-01-03", "2022-01-10").await.unwrap();
        provider.set_delay_ms(500);

        let updating = tokio::spawn({
            let registry = registry.clone();
            async move { registry.update_to("AAPL", date(2022, 1, 15)).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let tickers = tokio::time::timeout(Duration::from_millis(200), registry.tickers())
            .await
            .expect("listing blocked by update");
        assert_eq!(tickers, vec!["AAPL"]);
        let snapshot = tokio::time::timeout(Duration::from_millis(200), registry.get("AAPL"))
            .await
            .expect("get blocked by update")
            .unwrap();
        assert_eq!(snapshot.end_date, date(2022, 1, 10));

        let updated = updating.await.unwrap().unwrap();
        assert_eq!(updated.end_date, date(2022, 1, 15));
        assert_eq!(registry.get("AAPL").await.unwrap().end_date, date(2022, 1, 15));
    }

    #[tokio::test]
    async fn test_add_failure_leaves_registry_unchanged() {
        let dir = tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["AAPL"]);

        assert!(registry.add("NOPE", "2022-01-03", "2022-01-10").await.is_err());
        assert!(registry.tickers().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_lists_choices() {
        let dir = tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["AAPL"]);
        registry.add("AAPL", "2022-01-03", "2022-01-10").await.unwrap();

        let err = registry.get("TSLA").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Stock 'TSLA' not in list, choose from [\"AAPL\"]");
    }

    #[tokio::test]
    async fn test_update_to() {
        let dir = tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["AAPL"]);
        registry.add("AAPL", "2022-01-03", "2022-01-10").await.unwrap();

        let snapshot = registry.update_to("AAPL", date(2022, 1, 15)).await.unwrap();
        assert_eq!(snapshot.end_date, date(2022, 1, 15));
        assert_eq!(snapshot.data.len(), 10);

        let err = registry.update_to("AAPL", date(2022, 1, 15)).await.unwrap_err();
        assert!(matches!(err, AppError::UpToDate));

        let err = registry.update_to("TSLA", date(2022, 1, 15)).await.unwrap_err();
        assert_eq!(err.to_string(), "Stock 'TSLA' not in list, choose from [\"AAPL\"]");
    }

    #[tokio::test]
    async fn test_delete_keeps_cache_for_reuse() {
        let dir = tempdir().unwrap();
        let (registry, provider) = registry(dir.path(), &["AAPL"]);
        registry.add("AAPL", "2022-01-03", "2022-01-10").await.unwrap();

        assert_eq!(registry.delete("aapl").await.unwrap(), "AAPL");
        assert!(registry.tickers().await.is_empty());

        let err = registry.delete("AAPL").await.unwrap_err();
        assert_eq!(err.to_string(), "Stock 'AAPL' can't be deleted: choose from []");

        // Re-adding a covered range hits the cache file
        registry.add("AAPL", "2022-01-03", "2022-01-07").await.unwrap();
        assert_eq!(provider.download_count(), 1);
    }

    #[tokio::test]
    async fn test_day_lookup() {
        let dir = tempdir().unwrap();
        let (registry, _) = registry(dir.path(), &["AAPL"]);
        registry.add("AAPL", "2022-01-03", "2022-01-10").await.unwrap();

        let bar = registry.day("AAPL", "2022-01-04").await.unwrap();
        assert_eq!(bar.date, date(2022, 1, 4));

        assert!(matches!(registry.day("AAPL", "2022-01-08").await, Err(AppError::NotFound(_))));
        assert!(matches!(registry.day("AAPL", "yesterday").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(registry.day("TSLA", "2022-01-04").await, Err(AppError::NotFound(_))));
    }
}
