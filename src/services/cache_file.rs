//! Per-ticker CSV cache files
//!
//! The only index is the file name: `{TICKER}_{START}_{END}.csv`. Coverage is
//! re-derived by parsing that name back into dates.

use crate::constants::{CACHE_FILE_EXTENSION, CSV_HEADER, FILENAME_SEPARATOR};
use crate::error::{AppError, Result};
use crate::models::{CoverageRange, PriceBar};
use crate::utils::{format_date, parse_date};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A cache file located on disk together with its parsed coverage
#[derive(Debug, Clone, PartialEq)]
pub struct CacheFile {
    pub ticker: String,
    pub path: PathBuf,
    pub coverage: CoverageRange,
}

/// Build the file name for a ticker and coverage range
pub fn file_name(ticker: &str, coverage: &CoverageRange) -> String {
    format!(
        "{}{sep}{}{sep}{}.{}",
        ticker,
        format_date(&coverage.start),
        format_date(&coverage.end),
        CACHE_FILE_EXTENSION,
        sep = FILENAME_SEPARATOR
    )
}

/// Split a file name into ticker and coverage
///
/// Splits from the right so tickers containing the separator still parse.
pub fn parse_file_name(name: &str) -> Option<(String, CoverageRange)> {
    let stem = name.strip_suffix(&format!(".{}", CACHE_FILE_EXTENSION))?;

    let mut parts = stem.rsplitn(3, FILENAME_SEPARATOR);
    let end = parse_date(parts.next()?)?;
    let start = parse_date(parts.next()?)?;
    let ticker = parts.next()?;

    if ticker.is_empty() {
        return None;
    }

    let coverage = CoverageRange::new(start, end).ok()?;
    Some((ticker.to_string(), coverage))
}

/// List every parseable cache file in a directory
///
/// Files whose name cannot be parsed are skipped with a warning.
pub fn list_cache_files(dir: &Path) -> Result<Vec<CacheFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.ends_with(&format!(".{}", CACHE_FILE_EXTENSION)) {
            continue;
        }

        match parse_file_name(name) {
            Some((ticker, coverage)) => files.push(CacheFile {
                ticker,
                path: entry.path(),
                coverage,
            }),
            None => warn!(file = name, "Ignoring cache file with unparseable name"),
        }
    }

    files.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.coverage.end.cmp(&b.coverage.end)));
    Ok(files)
}

/// Find the cache file backing a ticker
///
/// When several files exist for the same ticker the one reaching furthest wins.
pub fn find_cache_file(dir: &Path, ticker: &str) -> Result<Option<CacheFile>> {
    let found = list_cache_files(dir)?
        .into_iter()
        .filter(|file| file.ticker == ticker)
        .max_by_key(|file| file.coverage.end);

    if let Some(ref file) = found {
        debug!(ticker, coverage = %file.coverage, path = %file.path.display(), "Found cache file");
    }
    Ok(found)
}

/// Read all bars from a cache file
pub fn read_bars(path: &Path) -> Result<Vec<PriceBar>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?;
    if headers.iter().ne(CSV_HEADER.iter().copied()) {
        return Err(AppError::Parse(format!(
            "Unexpected header in {}: {:?}",
            path.display(),
            headers
        )));
    }

    let mut bars = Vec::new();
    for record in reader.deserialize::<PriceBar>() {
        bars.push(record?);
    }
    Ok(bars)
}

/// Write bars to a cache file
///
/// Writes to a sibling temp file first, then renames it into place.
pub fn write_bars(path: &Path, bars: &[PriceBar]) -> Result<()> {
    let tmp_path = path.with_extension(format!("{}.tmp", CACHE_FILE_EXTENSION));

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp_path)?;
        writer.write_record(CSV_HEADER)?;
        for bar in bars {
            writer.serialize(bar)?;
        }
        writer.flush()?;
    }

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), records = bars.len(), "Wrote cache file");
    Ok(())
}
