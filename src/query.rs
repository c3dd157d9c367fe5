// src/query.rs
use crate::filter::{FilterState, StatusFilter};
use crate::time_window::{ResolvedWindow, TimeWindowResolver};
use serde::Serialize;

/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Fully resolved parameters of one paging request.
///
/// Search text and sort order are deliberately absent: they are refined
/// locally and never reach the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub identity: String,
    pub status: StatusFilter,
    pub hours: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub limit: u32,
    #[serde(skip)]
    pub window_fell_back: bool,
}

impl RequestDescriptor {
    /// Query string pairs in wire order; absent optionals are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("identity", self.identity.clone()),
            ("status", self.status.as_str().to_string()),
            ("hours", self.hours.to_string()),
        ];
        if let Some(start) = &self.start_time {
            pairs.push(("startTime", start.clone()));
        }
        if let Some(end) = &self.end_time {
            pairs.push(("endTime", end.clone()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }

    pub fn is_first_page(&self) -> bool {
        self.cursor.is_none()
    }
}

/// Assembles [`RequestDescriptor`]s from the current filter state
#[derive(Debug, Clone, Copy)]
pub struct QueryParameterBuilder {
    page_size: u32,
    resolver: TimeWindowResolver,
}

impl QueryParameterBuilder {
    pub fn new(page_size: u32, resolver: TimeWindowResolver) -> Self {
        Self { page_size, resolver }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn window(&self, filter: &FilterState) -> ResolvedWindow {
        self.resolver.resolve(filter.time, filter.custom_start, filter.custom_end)
    }

    pub fn build(&self, identity: &str, filter: &FilterState, cursor: Option<&str>) -> RequestDescriptor {
        let window = self.window(filter);
        let (start_time, end_time) = match window.iso_bounds() {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };

        RequestDescriptor {
            identity: identity.to_string(),
            status: filter.status,
            hours: window.hours,
            start_time,
            end_time,
            cursor: cursor.map(str::to_string),
            limit: self.page_size,
            window_fell_back: window.fell_back,
        }
    }
}

impl Default for QueryParameterBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, TimeWindowResolver::default())
    }
}
