// src/engine.rs
//! Alarm history session engine.
//!
//! Owns the filter state, the page fetcher and the derived view for one
//! target alarm identity. Every public operation takes `&self`: state lives
//! behind a [`tokio::sync::RwLock`] that is released before the network call
//! and re-acquired to apply the response, so the UI can observe loading and
//! error states while a request is in flight and a superseding request can
//! be issued at any time.

use crate::client::{Credential, HistoryApi};
use crate::config::Config;
use crate::error::{HistoryError, Result};
use crate::extractor::{IdentityMatch, RecordExtractor};
use crate::fetcher::{
    should_prefetch, Completion, FetchKind, FetchState, FetchTicket, Fetcher,
    DEFAULT_PREFETCH_THRESHOLD,
};
use crate::filter::{FilterPatch, FilterState, TimeFilter};
use crate::local_filter::{FilteredView, LocalFilterSortEngine};
use crate::model::AlarmInstance;
use crate::query::{QueryParameterBuilder, RequestDescriptor};
use crate::validation::{DateRangeValidator, DEFAULT_MAX_RANGE_DAYS};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Tunables for an engine instance
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub builder: QueryParameterBuilder,
    pub max_range_days: i64,
    pub prefetch_threshold: usize,
    pub identity_match: IdentityMatch,
    pub request_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            builder: config.query.builder(),
            max_range_days: config.query.max_custom_range_days,
            prefetch_threshold: config.query.prefetch_threshold,
            identity_match: config.query.identity_match,
            request_timeout: config.request_timeout(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            builder: QueryParameterBuilder::default(),
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            identity_match: IdentityMatch::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// What an engine operation ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page arrived and the view was rebuilt
    Loaded { kind: FetchKind, records: usize },
    /// The response was superseded before it arrived
    Stale,
    /// Nothing to fetch (already fetching, exhausted, or not near the end)
    Skipped,
    /// Only search/sort changed; view rebuilt without a request
    LocalOnly,
    /// The patch did not change anything
    Unchanged,
}

/// Read-only view handed to the UI layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub target: String,
    pub filter: FilterState,
    pub instances: Vec<AlarmInstance>,
    pub total_count: usize,
    pub summary: Option<AlarmInstance>,
    pub has_more: bool,
    pub is_loading: bool,
    pub is_fetching_more: bool,
    pub state: FetchState,
    #[serde(skip)]
    pub error: Option<HistoryError>,
    pub validation_error: Option<String>,
    pub server_total: Option<u64>,
}

struct Session {
    target: String,
    filter: FilterState,
    credential: Credential,
    fetcher: Fetcher,
    validator: DateRangeValidator,
    extractor: RecordExtractor,
    extracted: Vec<AlarmInstance>,
    view: FilteredView,
}

impl Session {
    fn rederive(&mut self) {
        self.extracted = self.extractor.extract(self.fetcher.pages());
        self.relocal();
    }

    fn relocal(&mut self) {
        self.view = LocalFilterSortEngine::apply(&self.extracted, &self.filter.search, self.filter.sort);
    }

    fn revalidate(&mut self) {
        if self.filter.time == TimeFilter::Custom {
            // Advisory only: the request degrades to the fallback window.
            let _ = self.validator.validate(self.filter.custom_start, self.filter.custom_end);
        } else {
            self.validator.clear();
        }
    }
}

/// A request ready to go out once the session lock is released
struct Prepared {
    ticket: FetchTicket,
    request: RequestDescriptor,
    credential: Credential,
}

pub struct AlarmHistoryEngine {
    api: Arc<dyn HistoryApi>,
    settings: EngineSettings,
    session: RwLock<Session>,
}

impl AlarmHistoryEngine {
    /// Create an idle session for `target`; call [`open`](Self::open) to load.
    pub fn new(api: Arc<dyn HistoryApi>, settings: EngineSettings, target: impl Into<String>) -> Self {
        Self::with_filter(api, settings, target, FilterState::default())
    }

    pub fn with_filter(
        api: Arc<dyn HistoryApi>,
        settings: EngineSettings,
        target: impl Into<String>,
        filter: FilterState,
    ) -> Self {
        let target = target.into();
        let mut session = Session {
            extractor: RecordExtractor::new(target.clone(), settings.identity_match),
            validator: DateRangeValidator::new(settings.max_range_days),
            target,
            filter,
            credential: Credential::anonymous(),
            fetcher: Fetcher::new(),
            extracted: Vec::new(),
            view: FilteredView::default(),
        };
        session.revalidate();

        Self {
            api,
            settings,
            session: RwLock::new(session),
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.session.get_mut().credential = credential;
        self
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Initial load of the first page.
    pub async fn open(&self) -> Result<FetchOutcome> {
        info!("Opening alarm history for '{}' via {}", self.target().await, self.api.name());
        self.refresh().await
    }

    /// Discard every held page and reload from the first page.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        let prepared = {
            let mut s = self.session.write().await;
            self.start_over(&mut s)
        };
        self.execute(prepared).await
    }

    /// Fetch the next page if one exists and nothing is in flight.
    pub async fn load_more(&self) -> Result<FetchOutcome> {
        let prepared = {
            let mut s = self.session.write().await;
            match s.fetcher.begin_next_page() {
                Some(ticket) => self.prepare(&s, ticket),
                None => return Ok(FetchOutcome::Skipped),
            }
        };
        self.execute(prepared).await
    }

    /// Consumer reports the index it is showing; loads more near the end.
    pub async fn on_visible_index(&self, index: usize) -> Result<FetchOutcome> {
        let near_end = {
            let s = self.session.read().await;
            s.fetcher.has_more()
                && should_prefetch(index, s.view.instances.len(), self.settings.prefetch_threshold)
        };
        if !near_end {
            return Ok(FetchOutcome::Skipped);
        }
        self.load_more().await
    }

    /// Re-issue the request that last failed; held pages are kept.
    pub async fn retry(&self) -> Result<FetchOutcome> {
        let prepared = {
            let mut s = self.session.write().await;
            match s.fetcher.retry() {
                Some(ticket) => self.prepare(&s, ticket),
                None => return Ok(FetchOutcome::Skipped),
            }
        };
        self.execute(prepared).await
    }

    /// Apply a partial filter update.
    ///
    /// Status, window and active custom-bound changes restart pagination;
    /// search text and sort order only rebuild the local view.
    pub async fn set_filter(&self, patch: FilterPatch) -> Result<FetchOutcome> {
        let prepared = {
            let mut s = self.session.write().await;
            let change = s.filter.apply(&patch);
            if patch.time.is_some() || patch.custom_start.is_some() || patch.custom_end.is_some() {
                s.revalidate();
            }

            if !change.server {
                if change.local {
                    debug!("Local refinement: search={:?} sort={:?}", s.filter.search, s.filter.sort);
                    s.relocal();
                    return Ok(FetchOutcome::LocalOnly);
                }
                return Ok(FetchOutcome::Unchanged);
            }
            self.start_over(&mut s)
        };
        self.execute(prepared).await
    }

    /// Repair an inverted custom range to one hour and reload.
    ///
    /// An oversized range is left alone and keeps its validation error.
    pub async fn auto_correct_dates(&self) -> Result<FetchOutcome> {
        let prepared = {
            let mut s = self.session.write().await;
            let (start, end) = (s.filter.custom_start, s.filter.custom_end);
            let corrected = s.validator.auto_correct(start, end);
            s.filter.custom_end = corrected;
            s.revalidate();
            if corrected == end {
                return Ok(FetchOutcome::Unchanged);
            }
            info!("Custom range end corrected from {} to {}", end, corrected);
            if s.filter.time != TimeFilter::Custom {
                return Ok(FetchOutcome::Unchanged);
            }
            self.start_over(&mut s)
        };
        self.execute(prepared).await
    }

    /// Switch the session to another alarm identity.
    pub async fn set_target(&self, identity: impl Into<String>) -> Result<FetchOutcome> {
        let identity = identity.into();
        let prepared = {
            let mut s = self.session.write().await;
            info!("Switching alarm history target '{}' -> '{}'", s.target, identity);
            s.extractor = RecordExtractor::new(identity.clone(), self.settings.identity_match);
            s.target = identity;
            self.start_over(&mut s)
        };
        self.execute(prepared).await
    }

    /// Replace the bearer credential, e.g. after re-authentication.
    pub async fn set_credential(&self, credential: Credential) {
        self.session.write().await.credential = credential;
    }

    /// Tear down: held pages are dropped and in-flight responses ignored.
    pub async fn close(&self) {
        let mut s = self.session.write().await;
        s.fetcher.reset();
        s.extracted.clear();
        s.view = FilteredView::default();
        debug!("Closed alarm history session for '{}'", s.target);
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub async fn snapshot(&self) -> HistorySnapshot {
        let s = self.session.read().await;
        HistorySnapshot {
            target: s.target.clone(),
            filter: s.filter.clone(),
            instances: s.view.instances.clone(),
            total_count: s.view.total_count,
            summary: s.view.summary().cloned(),
            has_more: s.fetcher.has_more(),
            is_loading: s.fetcher.is_loading(),
            is_fetching_more: s.fetcher.is_fetching_more(),
            state: s.fetcher.state(),
            error: s.fetcher.error().cloned(),
            validation_error: s.validator.error().map(str::to_string),
            server_total: s.fetcher.server_total(),
        }
    }

    pub async fn target(&self) -> String {
        self.session.read().await.target.clone()
    }

    pub async fn filter(&self) -> FilterState {
        self.session.read().await.filter.clone()
    }

    pub async fn held_pages(&self) -> usize {
        self.session.read().await.fetcher.pages().len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn start_over(&self, s: &mut Session) -> Prepared {
        let ticket = s.fetcher.begin_first_page();
        s.extracted.clear();
        s.view = FilteredView::default();
        self.prepare(s, ticket)
    }

    fn prepare(&self, s: &Session, ticket: FetchTicket) -> Prepared {
        let request = self.settings.builder.build(&s.target, &s.filter, ticket.cursor.as_deref());
        if request.window_fell_back {
            debug!("Request #{} uses fallback window of {} hours", ticket.seq, request.hours);
        }
        Prepared {
            ticket,
            request,
            credential: s.credential.clone(),
        }
    }

    async fn execute(&self, prepared: Prepared) -> Result<FetchOutcome> {
        let Prepared { ticket, request, credential } = prepared;
        debug!(
            "Request #{} ({:?}) for '{}' hours={} cursor={:?}",
            ticket.seq, ticket.kind, request.identity, request.hours, request.cursor
        );

        let timeout = self.settings.request_timeout;
        let outcome = match tokio::time::timeout(timeout, self.api.fetch_page(&request, &credential)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Request #{} timed out after {:?}", ticket.seq, timeout);
                Err(HistoryError::NetworkFailure(format!("request timed out after {:?}", timeout)))
            }
        };

        let mut s = self.session.write().await;
        match s.fetcher.complete(&ticket, outcome)? {
            Completion::Applied { kind, records } => {
                s.rederive();
                debug!(
                    "Session '{}' now holds {} pages, {} matching instances",
                    s.target,
                    s.fetcher.pages().len(),
                    s.view.total_count
                );
                Ok(FetchOutcome::Loaded { kind, records })
            }
            Completion::Stale => Ok(FetchOutcome::Stale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockHistoryApi;
    use crate::error::ErrorKind;
    use crate::filter::{SortOrder, StatusFilter};
    use crate::model::{AlarmCategory, AlarmHistoryRecord, AlarmStatus, AlarmValue, Page};
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use mockall::predicate::*;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, hour, 0, 0).unwrap()
    }

    fn page(hours: &[u32], cursor: Option<&str>) -> Page {
        Page {
            records: hours
                .iter()
                .map(|h| AlarmHistoryRecord {
                    id: format!("rec-{}", h),
                    timestamp: ts(*h),
                    analog: vec![AlarmInstance {
                        identity: "zone1.hz1pv".into(),
                        description: format!("reading at {}", h),
                        category: AlarmCategory::Analog,
                        zone: Some("zone1".into()),
                        value: AlarmValue::Number(800.0 + *h as f64),
                        unit: Some("°C".into()),
                        set_point: Some(800.0),
                        status: AlarmStatus::Active,
                        timestamp: ts(*h),
                        acknowledged_by: None,
                        acknowledged_at: None,
                        resolved_by: None,
                        resolved_at: None,
                        resolution_message: None,
                    }],
                    binary: vec![],
                })
                .collect(),
            next_cursor: cursor.map(str::to_string),
            filtered_total: None,
        }
    }

    fn engine(mock: MockHistoryApi) -> AlarmHistoryEngine {
        let filter = FilterState::new_at(ts(12));
        AlarmHistoryEngine::with_filter(Arc::new(mock), EngineSettings::default(), "zone1.hz1pv", filter)
    }

    #[test]
    fn test_fresh_session_is_idle() {
        let engine = engine(MockHistoryApi::new());
        let snap = tokio_test::block_on(engine.snapshot());
        assert_eq!(snap.state, FetchState::Idle);
        assert_eq!(snap.target, "zone1.hz1pv");
        assert!(snap.instances.is_empty() && snap.summary.is_none());
        assert!(!snap.is_loading && !snap.has_more);
    }

    #[tokio::test]
    async fn test_search_and_sort_issue_no_requests() {
        let mut mock = MockHistoryApi::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_page()
            .times(1)
            .returning(|_, _| Ok(page(&[1, 2, 3], None)));

        let engine = engine(mock);
        engine.open().await.unwrap();

        let outcome = engine.set_filter(FilterPatch::search("reading at 2")).await.unwrap();
        assert_eq!(outcome, FetchOutcome::LocalOnly);
        assert_eq!(engine.snapshot().await.total_count, 1);

        let outcome = engine.set_filter(FilterPatch::sort(SortOrder::Asc)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::LocalOnly);
        assert_eq!(
            engine.set_filter(FilterPatch::sort(SortOrder::Asc)).await.unwrap(),
            FetchOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_status_change_refetches_with_new_status() {
        let mut mock = MockHistoryApi::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_page()
            .withf(|req, _| req.status == StatusFilter::All)
            .times(1)
            .returning(|_, _| Ok(page(&[1], Some("c1"))));
        mock.expect_fetch_page()
            .withf(|req, _| req.status == StatusFilter::Resolved && req.cursor.is_none())
            .times(1)
            .returning(|_, _| Ok(page(&[4], None)));

        let engine = engine(mock);
        engine.open().await.unwrap();
        engine.set_filter(FilterPatch::status(StatusFilter::Resolved)).await.unwrap();

        let snap = engine.snapshot().await;
        assert_eq!(engine.held_pages().await, 1);
        assert_eq!(snap.instances[0].timestamp, ts(4));
        assert!(!snap.has_more);
    }

    #[tokio::test]
    async fn test_credential_is_forwarded() {
        let mut mock = MockHistoryApi::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_page()
            .with(always(), eq(Credential::bearer("tok")))
            .times(1)
            .returning(|_, _| Ok(page(&[], None)));

        let engine = engine(mock).with_credential(Credential::bearer("tok"));
        engine.open().await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_expired_surfaces_distinctly() {
        let mut mock = MockHistoryApi::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_page()
            .returning(|_, _| Err(HistoryError::AuthExpired("HTTP 401".into())));

        let engine = engine(mock);
        let err = engine.open().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthExpired);

        let snap = engine.snapshot().await;
        assert_eq!(snap.state, FetchState::Error);
        assert_eq!(snap.error.map(|e| e.kind()), Some(ErrorKind::AuthExpired));
    }

    #[tokio::test]
    async fn test_invalid_custom_range_is_advisory() {
        let mut mock = MockHistoryApi::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_page()
            .withf(|req, _| req.hours == 168 && req.start_time.is_none())
            .times(1)
            .returning(|_, _| Ok(page(&[], None)));
        mock.expect_fetch_page()
            .withf(|req, _| req.hours == 1 && req.start_time.is_some())
            .times(1)
            .returning(|_, _| Ok(page(&[], None)));

        let engine = engine(mock);
        let patch = FilterPatch::custom_range(ts(10), ts(9));
        engine.set_filter(patch).await.unwrap();
        assert_eq!(engine.snapshot().await.validation_error.as_deref(), Some("end before start"));

        engine.auto_correct_dates().await.unwrap();
        let snap = engine.snapshot().await;
        assert!(snap.validation_error.is_none());
        assert_eq!(snap.filter.custom_end - snap.filter.custom_start, ChronoDuration::hours(1));
    }

    #[tokio::test]
    async fn test_auto_correct_keeps_oversized_range_advisory() {
        let mut mock = MockHistoryApi::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_page()
            .withf(|req, _| req.hours == 168 && req.start_time.is_none())
            .times(1)
            .returning(|_, _| Ok(page(&[], None)));

        let engine = engine(mock);
        let start = ts(0);
        let end = start + ChronoDuration::days(120);
        engine.set_filter(FilterPatch::custom_range(start, end)).await.unwrap();
        assert_eq!(engine.snapshot().await.validation_error.as_deref(), Some("range too large"));

        let outcome = engine.auto_correct_dates().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Unchanged);
        let snap = engine.snapshot().await;
        assert_eq!(snap.validation_error.as_deref(), Some("range too large"));
        assert_eq!(snap.filter.custom_end, end);
    }

    #[tokio::test]
    async fn test_leaving_custom_clears_validation_error() {
        let mut mock = MockHistoryApi::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_page().times(2).returning(|_, _| Ok(page(&[], None)));

        let engine = engine(mock);
        engine.set_filter(FilterPatch::custom_range(ts(10), ts(9))).await.unwrap();
        engine.set_filter(FilterPatch::time(TimeFilter::Last7Days)).await.unwrap();
        assert!(engine.snapshot().await.validation_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out_as_network_failure() {
        struct Hanging;

        #[async_trait::async_trait]
        impl HistoryApi for Hanging {
            async fn fetch_page(&self, _: &RequestDescriptor, _: &Credential) -> Result<Page> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(page(&[], None))
            }

            fn name(&self) -> &str {
                "hanging"
            }
        }

        let settings = EngineSettings {
            request_timeout: Duration::from_secs(5),
            ..EngineSettings::default()
        };
        let engine = AlarmHistoryEngine::new(Arc::new(Hanging), settings, "zone1.hz1pv");
        let err = engine.open().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(engine.snapshot().await.state, FetchState::Error);
    }
}
