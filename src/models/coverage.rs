use crate::error::{AppError, Result};
use crate::utils::format_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date interval a cache file claims to hold
///
/// `end` follows the provider convention and is exclusive: a file covering
/// `2022-01-01..2022-12-31` was downloaded as `[2022-01-01, 2022-12-31)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoverageRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CoverageRange {
    /// Create a range, rejecting empty or inverted intervals
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(AppError::InvalidInput(
                "Start date must be before end date.".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// A cached file satisfies a request when its end date is not earlier
    /// than the requested end date
    pub fn covers_end(&self, requested_end: NaiveDate) -> bool {
        self.end >= requested_end
    }

    /// Same range with a new end date
    pub fn with_end(&self, end: NaiveDate) -> Result<Self> {
        Self::new(self.start, end)
    }
}

impl fmt::Display for CoverageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", format_date(&self.start), format_date(&self.end))
    }
}
