use crate::constants::{MAX_TICKER_LEN, TICKER_EXTRA_CHARS};
use crate::error::{AppError, Result};
use crate::models::{CoverageRange, PriceBar, StockSnapshot, TimeSeries};
use crate::services::cache_file::{self, CacheFile};
use crate::services::provider::SharedProvider;
use crate::utils::deduplication::{count_duplicates, dedup_by_date_keep_last};
use crate::utils::parse_date;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Normalize a ticker for lookups and file names
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Reject tickers that cannot be a symbol or would escape the data directory
fn validate_ticker_syntax(ticker: &str) -> Result<()> {
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || TICKER_EXTRA_CHARS.contains(&c));

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidInput(
            "Ticker must be a string representing a stock e.g. 'AAPL'.".to_string(),
        ))
    }
}

/// A tracked stock backed by a single CSV cache file
///
/// The entry's coverage always mirrors the file that backs it, not the
/// range originally requested.
#[derive(Clone)]
pub struct Stock {
    ticker: String,
    coverage: CoverageRange,
    bars: TimeSeries,
    data_dir: PathBuf,
    provider: SharedProvider,
}

impl Stock {
    /// Open a stock for a requested range, reusing the cache file when its
    /// end date reaches the requested end and downloading otherwise
    pub async fn open(
        ticker: &str,
        start_date: &str,
        end_date: &str,
        provider: SharedProvider,
        data_dir: &Path,
    ) -> Result<Self> {
        let ticker = normalize_ticker(ticker);
        validate_ticker_syntax(&ticker)?;

        let start = parse_date(start_date).ok_or_else(|| {
            AppError::InvalidInput("Start date must be in 'YYYY-MM-DD' format.".to_string())
        })?;
        let end = parse_date(end_date).ok_or_else(|| {
            AppError::InvalidInput("End date must be in 'YYYY-MM-DD' format.".to_string())
        })?;
        let requested = CoverageRange::new(start, end)?;

        if !provider.has_recent_history(&ticker).await? {
            return Err(AppError::InvalidInput(
                "Ticker symbol doesn't match known stock.".to_string(),
            ));
        }

        fs::create_dir_all(data_dir)?;

        let mut stock = Self {
            ticker,
            coverage: requested,
            bars: Vec::new(),
            data_dir: data_dir.to_path_buf(),
            provider,
        };

        match cache_file::find_cache_file(data_dir, &stock.ticker)? {
            Some(cached) if cached.coverage.covers_end(requested.end) => {
                info!(
                    ticker = %stock.ticker,
                    coverage = %cached.coverage,
                    "Stock data already exists: {}",
                    cached.path.display()
                );
                stock.bars = cache_file::read_bars(&cached.path)?;
                stock.coverage = cached.coverage;
            }
            stale => {
                stock.download(requested, stale).await?;
            }
        }

        Ok(stock)
    }

    /// Load a stock purely from its existing cache file
    pub fn from_cache(ticker: &str, provider: SharedProvider, data_dir: &Path) -> Result<Self> {
        let ticker = normalize_ticker(ticker);
        validate_ticker_syntax(&ticker)?;

        let cached = cache_file::find_cache_file(data_dir, &ticker)?.ok_or_else(|| {
            AppError::NotFound(format!("No cached data for stock '{}'", ticker))
        })?;

        Ok(Self {
            bars: cache_file::read_bars(&cached.path)?,
            coverage: cached.coverage,
            ticker,
            data_dir: data_dir.to_path_buf(),
            provider,
        })
    }

    /// Extend the cache file up to `today`
    ///
    /// Downloads only `[file_end, today)` and appends it. Fails with
    /// [`AppError::UpToDate`] when the file already reaches today.
    pub async fn update(&mut self, today: NaiveDate) -> Result<()> {
        let Some(cached) = cache_file::find_cache_file(&self.data_dir, &self.ticker)? else {
            warn!(ticker = %self.ticker, "Cache file missing, downloading full range again");
            return self.download(self.coverage, None).await;
        };

        if cached.coverage.end >= today {
            return Err(AppError::UpToDate);
        }

        let mut bars = cache_file::read_bars(&cached.path)?;
        let new_bars = self
            .provider
            .fetch_history(&self.ticker, cached.coverage.end, today)
            .await?;
        let fetched = new_bars.len();
        bars.extend(new_bars);
        let bars = self.merge(bars);

        let coverage = cached.coverage.with_end(today)?;
        self.replace_file(coverage, &bars, Some(&cached))?;

        info!(
            ticker = %self.ticker,
            coverage = %coverage,
            fetched,
            total = bars.len(),
            "Stock data updated"
        );

        self.coverage = coverage;
        self.bars = bars;
        Ok(())
    }

    /// Download `requested` and write it as the new cache file
    ///
    /// A stale file's bars are merged underneath the download and its start is
    /// kept, so history already on disk survives the replacement.
    async fn download(&mut self, requested: CoverageRange, stale: Option<CacheFile>) -> Result<()> {
        let (range, mut bars) = match &stale {
            Some(old) => {
                let start = requested.start.min(old.coverage.start);
                let kept = cache_file::read_bars(&old.path).unwrap_or_else(|e| {
                    warn!(ticker = %self.ticker, error = %e, "Unreadable stale cache file, downloading without it");
                    Vec::new()
                });
                (CoverageRange::new(start, requested.end)?, kept)
            }
            None => (requested, Vec::new()),
        };

        let fetched = self
            .provider
            .fetch_history(&self.ticker, range.start, range.end)
            .await?;
        bars.extend(fetched);
        let bars = self.merge(bars);

        let path = self.replace_file(range, &bars, stale.as_ref())?;
        info!(ticker = %self.ticker, records = bars.len(), "Stock data saved to {}", path.display());

        self.coverage = range;
        self.bars = bars;
        Ok(())
    }

    /// Deduplicate cached-then-fetched bars, newest copy wins
    fn merge(&self, bars: Vec<PriceBar>) -> TimeSeries {
        let duplicates = count_duplicates(&bars);
        if duplicates > 0 {
            debug!(ticker = %self.ticker, duplicates, "Replacing overlapping bars with fresh data");
        }
        dedup_by_date_keep_last(bars)
    }

    /// Write bars under the name for `coverage` and drop the file it supersedes
    fn replace_file(
        &self,
        coverage: CoverageRange,
        bars: &[PriceBar],
        superseded: Option<&CacheFile>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(cache_file::file_name(&self.ticker, &coverage));
        cache_file::write_bars(&path, bars)?;

        if let Some(old) = superseded {
            if old.path != path {
                match fs::remove_file(&old.path) {
                    Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
                    _ => {}
                }
            }
        }
        Ok(path)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn coverage(&self) -> CoverageRange {
        self.coverage
    }

    pub fn start_date(&self) -> NaiveDate {
        self.coverage.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.coverage.end
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Bar recorded for a single trading day
    pub fn bar_on(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.bars
            .binary_search_by_key(&date, |bar| bar.date)
            .ok()
            .map(|idx| &self.bars[idx])
    }

    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot {
            ticker: self.ticker.clone(),
            start_date: self.coverage.start,
            end_date: self.coverage.end,
            data: self.bars.clone(),
        }
    }
}

impl std::fmt::Debug for Stock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stock")
            .field("ticker", &self.ticker)
            .field("coverage", &self.coverage)
            .field("bars", &self.bars.len())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for Stock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stock: {}\nStart Date: {}\nEnd Date: {}",
            self.ticker, self.coverage.start, self.coverage.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::testing::FakeProvider;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cache_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_open_downloads_and_writes_cache_file() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        let stock = Stock::open("aapl", "2022-01-03", "2022-01-10", provider.clone(), dir.path())
            .await
            .unwrap();

        assert_eq!(stock.ticker(), "AAPL");
        assert_eq!(stock.start_date(), date(2022, 1, 3));
        assert_eq!(stock.end_date(), date(2022, 1, 10));
        // Mon 3rd .. Fri 7th
        assert_eq!(stock.bars().len(), 5);
        assert_eq!(provider.download_count(), 1);
        assert_eq!(cache_names(dir.path()), vec!["AAPL_2022-01-03_2022-01-10.csv"]);
    }

    #[tokio::test]
    async fn test_open_reuses_cache_when_end_is_covered() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        Stock::open("AAPL", "2022-01-03", "2022-02-01", provider.clone(), dir.path())
            .await
            .unwrap();
        let stock = Stock::open("AAPL", "2022-01-10", "2022-01-20", provider.clone(), dir.path())
            .await
            .unwrap();

        assert_eq!(provider.download_count(), 1);
        // Coverage comes from the file, not from the request
        assert_eq!(stock.start_date(), date(2022, 1, 3));
        assert_eq!(stock.end_date(), date(2022, 2, 1));
    }

    #[tokio::test]
    async fn test_open_redownloads_when_cache_ends_too_early() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        Stock::open("AAPL", "2022-01-03", "2022-01-10", provider.clone(), dir.path())
            .await
            .unwrap();
        let stock = Stock::open("AAPL", "2022-01-03", "2022-01-17", provider.clone(), dir.path())
            .await
            .unwrap();

        assert_eq!(provider.download_count(), 2);
        assert_eq!(stock.end_date(), date(2022, 1, 17));
        assert_eq!(stock.bars().len(), 10);
        // Stale file is replaced, not left next to the new one
        assert_eq!(cache_names(dir.path()), vec!["AAPL_2022-01-03_2022-01-17.csv"]);
    }

    #[tokio::test]
    async fn test_open_keeps_history_before_requested_start() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        Stock::open("AAPL", "2021-12-01", "2022-01-10", provider.clone(), dir.path())
            .await
            .unwrap();
        let stock = Stock::open("AAPL", "2022-01-03", "2022-01-17", provider.clone(), dir.path())
            .await
            .unwrap();

        // The wider file starts where the old one did
        assert_eq!(stock.start_date(), date(2021, 12, 1));
        assert_eq!(stock.end_date(), date(2022, 1, 17));
        assert_eq!(
            provider.downloads().last().unwrap(),
            &("AAPL".to_string(), date(2021, 12, 1), date(2022, 1, 17))
        );
        // 23 weekdays in December + 10 in January
        assert_eq!(stock.bars().len(), 33);
        assert_eq!(stock.bars()[0].date, date(2021, 12, 1));
        assert_eq!(cache_names(dir.path()), vec!["AAPL_2021-12-01_2022-01-17.csv"]);

        let on_disk = cache_file::read_bars(&dir.path().join("AAPL_2021-12-01_2022-01-17.csv")).unwrap();
        assert_eq!(on_disk, stock.bars());
    }

    #[tokio::test]
    async fn test_open_validation_errors() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        let err = Stock::open("AAPL", "2022-12-31", "2022-01-01", provider.clone(), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Start date must be before end date.");

        let err = Stock::open("AAPL", "01/01/2022", "2022-12-31", provider.clone(), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Start date must be in 'YYYY-MM-DD' format.");

        let err = Stock::open("AAPL", "2022-01-01", "2022-12-32", provider.clone(), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "End date must be in 'YYYY-MM-DD' format.");

        let err = Stock::open("ZZZZ", "2022-01-01", "2022-12-31", provider.clone(), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Ticker symbol doesn't match known stock.");

        let err = Stock::open("../etc", "2022-01-01", "2022-12-31", provider.clone(), dir.path())
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        assert_eq!(provider.download_count(), 0);
    }

    #[tokio::test]
    async fn test_update_appends_missing_days() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        let mut stock = Stock::open("AAPL", "2022-01-03", "2022-01-10", provider.clone(), dir.path())
            .await
            .unwrap();
        stock.update(date(2022, 1, 15)).await.unwrap();

        assert_eq!(stock.end_date(), date(2022, 1, 15));
        assert_eq!(stock.start_date(), date(2022, 1, 3));
        // 5 original + Mon 10th .. Fri 14th
        assert_eq!(stock.bars().len(), 10);
        assert_eq!(
            provider.downloads().last().unwrap(),
            &("AAPL".to_string(), date(2022, 1, 10), date(2022, 1, 15))
        );
        assert_eq!(cache_names(dir.path()), vec!["AAPL_2022-01-03_2022-01-15.csv"]);

        // File content matches memory
        let on_disk = cache_file::read_bars(&dir.path().join("AAPL_2022-01-03_2022-01-15.csv")).unwrap();
        assert_eq!(on_disk, stock.bars());
    }

    #[tokio::test]
    async fn test_update_when_up_to_date() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        let mut stock = Stock::open("AAPL", "2022-01-03", "2022-01-10", provider.clone(), dir.path())
            .await
            .unwrap();

        let err = stock.update(date(2022, 1, 10)).await.unwrap_err();
        assert!(matches!(err, AppError::UpToDate));
        assert_eq!(provider.download_count(), 1);
    }

    #[tokio::test]
    async fn test_update_redownloads_missing_file() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        let mut stock = Stock::open("AAPL", "2022-01-03", "2022-01-10", provider.clone(), dir.path())
            .await
            .unwrap();
        fs::remove_file(dir.path().join("AAPL_2022-01-03_2022-01-10.csv")).unwrap();

        stock.update(date(2022, 1, 15)).await.unwrap();

        // Range is unchanged; the file is simply restored
        assert_eq!(stock.end_date(), date(2022, 1, 10));
        assert_eq!(provider.download_count(), 2);
        assert_eq!(cache_names(dir.path()), vec!["AAPL_2022-01-03_2022-01-10.csv"]);
    }

    #[tokio::test]
    async fn test_bar_on_and_snapshot() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        let stock = Stock::open("AAPL", "2022-01-03", "2022-01-10", provider, dir.path())
            .await
            .unwrap();

        let bar = stock.bar_on(date(2022, 1, 5)).unwrap();
        assert_eq!(bar.close, FakeProvider::close_on(date(2022, 1, 5)));
        assert!(stock.bar_on(date(2022, 1, 8)).is_none());

        let snapshot = stock.snapshot();
        assert_eq!(snapshot.ticker, "AAPL");
        assert_eq!(snapshot.data.len(), 5);
        assert_eq!(
            stock.to_string(),
            "Stock: AAPL\nStart Date: 2022-01-03\nEnd Date: 2022-01-10"
        );
    }

    #[tokio::test]
    async fn test_from_cache() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider::shared(&["AAPL"]);

        assert!(matches!(
            Stock::from_cache("AAPL", provider.clone(), dir.path()),
            Err(AppError::NotFound(_))
        ));

        Stock::open("AAPL", "2022-01-03", "2022-01-10", provider.clone(), dir.path())
            .await
            .unwrap();
        let stock = Stock::from_cache("aapl", provider.clone(), dir.path()).unwrap();
        assert_eq!(stock.bars().len(), 5);
        assert_eq!(provider.download_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::failing());

        let err = Stock::open("AAPL", "2022-01-03", "2022-01-10", provider, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert!(!err.is_client_error());
    }
}
