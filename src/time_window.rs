// src/time_window.rs
//! Maps a symbolic time filter to the hour count and optional absolute
//! bounds sent to the history backend.

use crate::filter::TimeFilter;
use crate::validation::{check_range, DEFAULT_MAX_RANGE_DAYS};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

/// Hours used when a custom range fails validation (7 days)
pub const FALLBACK_HOURS: u32 = 168;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Concrete window derived from a time filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub hours: u32,
    /// Absolute bounds, only present for a validated custom range
    pub bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Set when a rejected custom range degraded to the fallback window
    pub fell_back: bool,
}

impl ResolvedWindow {
    fn hours(hours: u32) -> Self {
        Self { hours, bounds: None, fell_back: false }
    }

    /// ISO-8601 renderings of the bounds, as sent on the wire
    pub fn iso_bounds(&self) -> Option<(String, String)> {
        self.bounds.map(|(start, end)| (to_iso(start), to_iso(end)))
    }
}

pub fn to_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Copy)]
pub struct TimeWindowResolver {
    fallback_hours: u32,
    max_range_days: i64,
}

impl TimeWindowResolver {
    pub fn new(fallback_hours: u32, max_range_days: i64) -> Self {
        Self { fallback_hours, max_range_days }
    }

    pub fn resolve(
        &self,
        filter: TimeFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ResolvedWindow {
        match filter {
            TimeFilter::Last24Hours => ResolvedWindow::hours(24),
            TimeFilter::Last3Days => ResolvedWindow::hours(72),
            TimeFilter::Last7Days => ResolvedWindow::hours(168),
            TimeFilter::Last30Days => ResolvedWindow::hours(720),
            TimeFilter::Custom => match check_range(start, end, self.max_range_days) {
                Ok(()) => {
                    let millis = (end - start).num_milliseconds();
                    let hours = (millis + MILLIS_PER_HOUR - 1) / MILLIS_PER_HOUR;
                    ResolvedWindow {
                        hours: u32::try_from(hours).unwrap_or(u32::MAX),
                        bounds: Some((start, end)),
                        fell_back: false,
                    }
                }
                Err(e) => {
                    warn!(
                        "Custom range rejected ({}), falling back to {} hours",
                        e, self.fallback_hours
                    );
                    ResolvedWindow {
                        hours: self.fallback_hours,
                        bounds: None,
                        fell_back: true,
                    }
                }
            },
        }
    }
}

impl Default for TimeWindowResolver {
    fn default() -> Self {
        Self::new(FALLBACK_HOURS, DEFAULT_MAX_RANGE_DAYS)
    }
}
