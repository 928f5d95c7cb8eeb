//! Date-Keyed Deduplication Utilities
//!
//! Incremental updates re-download the boundary day of a cache file, so the
//! same date can appear twice when old and new bars are concatenated.

use crate::models::PriceBar;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Deduplicate bars by date, keeping the last occurrence, and sort ascending
pub fn dedup_by_date_keep_last(bars: Vec<PriceBar>) -> Vec<PriceBar> {
    let mut seen_dates: HashSet<NaiveDate> = HashSet::new();

    let mut unique: Vec<PriceBar> = bars
        .into_iter()
        .rev()
        .filter(|bar| seen_dates.insert(bar.date))
        .collect();

    unique.sort_by_key(|bar| bar.date);
    unique
}

/// Count duplicate dates in a dataset
pub fn count_duplicates(bars: &[PriceBar]) -> usize {
    let mut seen_dates = HashSet::new();
    bars.iter().filter(|bar| !seen_dates.insert(bar.date)).count()
}
