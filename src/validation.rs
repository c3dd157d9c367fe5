// src/validation.rs
use crate::error::{HistoryError, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Reason reported when the range end does not come after its start
pub const END_BEFORE_START: &str = "end before start";

/// Reason reported when the range spans more than the allowed number of days
pub const RANGE_TOO_LARGE: &str = "range too large";

/// Default upper bound on a custom range
pub const DEFAULT_MAX_RANGE_DAYS: i64 = 90;

/// Largest configurable upper bound on a custom range
pub const MAX_RANGE_DAYS_LIMIT: i64 = 36_500;

/// Stateless range check shared by the validator and the time window resolver.
pub fn check_range(start: DateTime<Utc>, end: DateTime<Utc>, max_days: i64) -> Result<()> {
    if end <= start {
        return Err(HistoryError::Validation(END_BEFORE_START.to_string()));
    }
    let limit = Duration::try_days(max_days)
        .ok_or_else(|| HistoryError::Validation(RANGE_TOO_LARGE.to_string()))?;
    if end - start > limit {
        return Err(HistoryError::Validation(RANGE_TOO_LARGE.to_string()));
    }
    Ok(())
}

/// Validates custom date ranges and keeps the last user-visible error.
#[derive(Debug, Clone)]
pub struct DateRangeValidator {
    max_days: i64,
    error: Option<String>,
}

impl DateRangeValidator {
    pub fn new(max_days: i64) -> Self {
        Self { max_days, error: None }
    }

    /// Check `start..end`, storing the failure reason or clearing it on success.
    pub fn validate(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
        match check_range(start, end, self.max_days) {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => {
                debug!("Rejected custom range {} .. {}: {}", start, end, e);
                if let HistoryError::Validation(reason) = &e {
                    self.error = Some(reason.clone());
                }
                Err(e)
            }
        }
    }

    /// One-click repair: an inverted or empty range becomes one hour long.
    ///
    /// Returns the corrected end and re-validates it. Ranges that are already
    /// ordered keep their end, and an oversized range keeps its error.
    pub fn auto_correct(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
        let end = if end <= start { start + Duration::hours(1) } else { end };
        let _ = self.validate(start, end);
        end
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear(&mut self) {
        self.error = None;
    }
}

impl Default for DateRangeValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RANGE_DAYS)
    }
}
