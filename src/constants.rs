//! Cache File Constants
//!
//! Defines the on-disk layout of the per-ticker cache files.
//!
//! ## File Naming
//!
//! Each ticker owns exactly one CSV file whose name encodes the date range
//! it covers:
//!
//! ```text
//! {TICKER}_{START}_{END}.csv      e.g. AAPL_2022-01-01_2022-12-31.csv
//! ```
//!
//! `END` is exclusive: the provider was asked for `[START, END)`.
//!
//! ## CSV Format
//!
//! 7 columns: date, open, high, low, close, adj_close, volume

/// Date format used in file names, CSV rows and the HTTP API
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Extension of cache files
pub const CACHE_FILE_EXTENSION: &str = "csv";

/// Separator between ticker, start date and end date in a cache file name
pub const FILENAME_SEPARATOR: char = '_';

/// Number of columns in a cache file
pub const CSV_COLUMNS: usize = 7;

/// Header row written to every cache file
pub const CSV_HEADER: [&str; CSV_COLUMNS] =
    ["date", "open", "high", "low", "close", "adj_close", "volume"];

/// Calendar days of history requested when checking that a ticker exists
/// (a full week spans five weekdays)
pub const TICKER_PROBE_DAYS: i64 = 7;

/// Characters allowed in a ticker besides ASCII alphanumerics
/// (BRK-B, BF.B, ^GSPC, EURUSD=X)
pub const TICKER_EXTRA_CHARS: &[char] = &['.', '-', '^', '=', '_'];

/// Maximum ticker length accepted by the API
pub const MAX_TICKER_LEN: usize = 16;

/// Default cache directory when STOCK_DATA_DIR is unset
pub const DEFAULT_DATA_DIR: &str = "stock_data";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default allowed CORS origin (Vite dev server)
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

/// Default Yahoo Finance endpoint
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Default timeout for provider requests
pub const DEFAULT_YAHOO_TIMEOUT_SECS: u64 = 30;
