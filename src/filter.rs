// src/filter.rs
//! User-selected filter state for one alarm history session.
//!
//! Fields split into two groups: server-affecting (status, time window,
//! custom bounds) which restart pagination when changed, and local-only
//! (search text, sort order) which only re-run the local pass.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HistoryError;

/// Server-side status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Active,
    Acknowledged,
    Resolved,
    #[default]
    All,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Active => "active",
            StatusFilter::Acknowledged => "acknowledged",
            StatusFilter::Resolved => "resolved",
            StatusFilter::All => "all",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(StatusFilter::Active),
            "acknowledged" => Ok(StatusFilter::Acknowledged),
            "resolved" => Ok(StatusFilter::Resolved),
            "all" => Ok(StatusFilter::All),
            other => Err(HistoryError::Config(format!("Unknown status filter '{}'", other))),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbolic time range selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFilter {
    #[default]
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "3d")]
    Last3Days,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "custom")]
    Custom,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Last24Hours => "24h",
            TimeFilter::Last3Days => "3d",
            TimeFilter::Last7Days => "7d",
            TimeFilter::Last30Days => "30d",
            TimeFilter::Custom => "custom",
        }
    }
}

impl FromStr for TimeFilter {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "24h" => Ok(TimeFilter::Last24Hours),
            "3d" => Ok(TimeFilter::Last3Days),
            "7d" => Ok(TimeFilter::Last7Days),
            "30d" => Ok(TimeFilter::Last30Days),
            "custom" => Ok(TimeFilter::Custom),
            other => Err(HistoryError::Config(format!("Unknown time filter '{}'", other))),
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp ordering of the final sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

/// Complete filter state for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub status: StatusFilter,
    pub time: TimeFilter,
    pub custom_start: DateTime<Utc>,
    pub custom_end: DateTime<Utc>,
    pub search: String,
    pub sort: SortOrder,
}

impl FilterState {
    /// Defaults with custom bounds anchored at `now`
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            status: StatusFilter::default(),
            time: TimeFilter::default(),
            custom_start: now - Duration::days(7),
            custom_end: now,
            search: String::new(),
            sort: SortOrder::default(),
        }
    }

    /// Apply a partial update, reporting which groups of fields changed.
    pub fn apply(&mut self, patch: &FilterPatch) -> FilterChange {
        let before = self.clone();

        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(start) = patch.custom_start {
            self.custom_start = start;
        }
        if let Some(end) = patch.custom_end {
            self.custom_end = end;
        }
        if let Some(search) = &patch.search {
            self.search = search.clone();
        }
        if let Some(sort) = patch.sort {
            self.sort = sort;
        }

        let custom_changed = self.time == TimeFilter::Custom
            && (before.custom_start != self.custom_start || before.custom_end != self.custom_end);

        FilterChange {
            server: before.status != self.status || before.time != self.time || custom_changed,
            local: before.search != self.search || before.sort != self.sort,
        }
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new_at(Utc::now())
    }
}

/// Partial filter update; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPatch {
    pub status: Option<StatusFilter>,
    pub time: Option<TimeFilter>,
    pub custom_start: Option<DateTime<Utc>>,
    pub custom_end: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort: Option<SortOrder>,
}

impl FilterPatch {
    pub fn status(status: StatusFilter) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn time(time: TimeFilter) -> Self {
        Self { time: Some(time), ..Self::default() }
    }

    pub fn custom_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            time: Some(TimeFilter::Custom),
            custom_start: Some(start),
            custom_end: Some(end),
            ..Self::default()
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self { search: Some(query.into()), ..Self::default() }
    }

    pub fn sort(order: SortOrder) -> Self {
        Self { sort: Some(order), ..Self::default() }
    }
}

/// Which field groups a patch actually changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterChange {
    /// Status, window or active custom bounds changed: pagination restarts
    pub server: bool,
    /// Search text or sort order changed: local pass only
    pub local: bool,
}
