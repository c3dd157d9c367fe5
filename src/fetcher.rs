// src/fetcher.rs
//! Cursor-based page retrieval state machine.
//!
//! The fetcher never performs I/O itself. A fetch is split in two halves:
//! `begin_*` hands out a [`FetchTicket`] stamped with a fresh sequence
//! number, and [`Fetcher::complete`] applies the outcome only if that ticket
//! is still the one in flight. Anything older is reported as
//! [`Completion::Stale`] and dropped.
//!
//! ```text
//! idle ──► fetchingFirstPage ──► holdingPages ⇄ fetchingNextPage
//!                 │                                    │
//!                 └──────────────► error ◄─────────────┘
//! ```

use crate::error::{HistoryError, Result};
use crate::model::Page;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Default distance from the end of the visible list that triggers a prefetch
pub const DEFAULT_PREFETCH_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchState {
    Idle,
    FetchingFirstPage,
    HoldingPages,
    FetchingNextPage,
    Error,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchState::Idle => "idle",
            FetchState::FetchingFirstPage => "fetchingFirstPage",
            FetchState::HoldingPages => "holdingPages",
            FetchState::FetchingNextPage => "fetchingNextPage",
            FetchState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    FirstPage,
    NextPage,
}

/// Handle for one issued request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub kind: FetchKind,
    pub cursor: Option<String>,
}

/// Result of applying a response to the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Page stored; carries the number of records it held
    Applied { kind: FetchKind, records: usize },
    /// Response belonged to a superseded request and was discarded
    Stale,
}

#[derive(Debug)]
pub struct Fetcher {
    state: FetchState,
    pages: Vec<Page>,
    next_cursor: Option<String>,
    server_total: Option<u64>,
    seq: u64,
    in_flight: Option<u64>,
    last_request: Option<(FetchKind, Option<String>)>,
    error: Option<HistoryError>,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            state: FetchState::Idle,
            pages: Vec::new(),
            next_cursor: None,
            server_total: None,
            seq: 0,
            in_flight: None,
            last_request: None,
            error: None,
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Discard every held page and start over from the first page.
    ///
    /// Always succeeds; an in-flight request is superseded.
    pub fn begin_first_page(&mut self) -> FetchTicket {
        if let Some(stale) = self.in_flight {
            debug!("Superseding in-flight request #{}", stale);
        }
        self.pages.clear();
        self.next_cursor = None;
        self.server_total = None;
        self.error = None;
        self.issue(FetchKind::FirstPage, None)
    }

    /// Request the page after the last held one.
    ///
    /// Returns `None` while another request is in flight, before the first
    /// page arrived, after an error, or once the history is exhausted.
    pub fn begin_next_page(&mut self) -> Option<FetchTicket> {
        if self.state != FetchState::HoldingPages {
            return None;
        }
        let cursor = self.next_cursor.clone()?;
        Some(self.issue(FetchKind::NextPage, Some(cursor)))
    }

    /// Re-issue the most recent failed request, keeping held pages.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if self.state != FetchState::Error {
            return None;
        }
        let (kind, cursor) = self.last_request.clone()?;
        self.error = None;
        Some(self.issue(kind, cursor))
    }

    /// Apply the outcome of `ticket`.
    ///
    /// Failures of the current request move to `error` and are returned;
    /// anything belonging to a superseded request is dropped silently.
    pub fn complete(&mut self, ticket: &FetchTicket, outcome: Result<Page>) -> Result<Completion> {
        if self.in_flight != Some(ticket.seq) {
            debug!(
                "Dropping stale response for request #{} (current: {:?})",
                ticket.seq, self.in_flight
            );
            return Ok(Completion::Stale);
        }
        self.in_flight = None;

        match outcome {
            Ok(page) => {
                let records = page.records.len();
                self.next_cursor = page.next_cursor.clone();
                if page.filtered_total.is_some() {
                    self.server_total = page.filtered_total;
                }
                self.pages.push(page);
                self.state = FetchState::HoldingPages;
                debug!(
                    "Request #{} stored page {} ({} records, more: {})",
                    ticket.seq,
                    self.pages.len(),
                    records,
                    self.has_more()
                );
                Ok(Completion::Applied { kind: ticket.kind, records })
            }
            Err(e) => {
                warn!("Request #{} failed: {}", ticket.seq, e);
                self.error = Some(e.clone());
                self.state = FetchState::Error;
                Err(e)
            }
        }
    }

    /// Forget everything and ignore whatever is still in flight.
    pub fn reset(&mut self) {
        self.seq += 1;
        self.in_flight = None;
        self.pages.clear();
        self.next_cursor = None;
        self.server_total = None;
        self.last_request = None;
        self.error = None;
        self.state = FetchState::Idle;
    }

    fn issue(&mut self, kind: FetchKind, cursor: Option<String>) -> FetchTicket {
        self.seq += 1;
        self.in_flight = Some(self.seq);
        self.last_request = Some((kind, cursor.clone()));
        self.state = match kind {
            FetchKind::FirstPage => FetchState::FetchingFirstPage,
            FetchKind::NextPage => FetchState::FetchingNextPage,
        };
        FetchTicket { seq: self.seq, kind, cursor }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state == FetchState::FetchingFirstPage
    }

    pub fn is_fetching_more(&self) -> bool {
        self.state == FetchState::FetchingNextPage
    }

    pub fn error(&self) -> Option<&HistoryError> {
        self.error.as_ref()
    }

    pub fn server_total(&self) -> Option<u64> {
        self.server_total
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the consumer looking at `visible_index` is close enough to the end
/// of a `len` long list to ask for the next page.
pub fn should_prefetch(visible_index: usize, len: usize, threshold: usize) -> bool {
    len == 0 || visible_index.saturating_add(threshold).saturating_add(1) >= len
}
