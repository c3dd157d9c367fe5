//! alarmtrail - Alarm History Query Engine
//!
//! Client-side engine for inspecting the historical trail of a single alarm
//! signal. The backend stores alarm events as paginated, timestamped records
//! that bundle many analog and binary alarms together; this crate pages
//! through them, pulls out the occurrences of one alarm identity and applies
//! local search and ordering on top.
//!
//! # Pipeline
//!
//! ```text
//! FilterState ─► QueryParameterBuilder ─► Fetcher ─► RecordExtractor ─► LocalFilterSortEngine
//!                  ▲            ▲
//!     TimeWindowResolver   DateRangeValidator
//! ```
//!
//! # Feature Flags
//!
//! - `http` (default): reqwest-backed [`client::HttpHistoryApi`] and the
//!   `alarmtrail` binary
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use alarmtrail::{AlarmHistoryEngine, Config, EngineSettings, FilterPatch, HttpHistoryApi};
//!
//! # async fn run() -> alarmtrail::Result<()> {
//! let config = Config::from_file("alarmtrail.yaml")?.with_env_overrides()?;
//! let api = Arc::new(HttpHistoryApi::new(&config.api)?);
//! let engine = AlarmHistoryEngine::new(api, EngineSettings::from_config(&config), "zone1.hz1pv");
//!
//! engine.open().await?;
//! engine.set_filter(FilterPatch::search("overheat")).await?;
//! let view = engine.snapshot().await;
//! println!("{} matching occurrences", view.total_count);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// CORE MODULES
// ============================================================================

/// Typed errors shared by every component
pub mod error;

/// Alarm instances, history records and pages
pub mod model;

/// User-selected filter state and partial updates
pub mod filter;

/// Custom date range checks and auto-correction
pub mod validation;

/// Symbolic time ranges to hour counts and absolute bounds
pub mod time_window;

/// Request descriptors built from the current filter state
pub mod query;

/// Cursor-based paging state machine
pub mod fetcher;

/// Extraction of one identity's occurrences from mixed records
pub mod extractor;

/// Local search and ordering
pub mod local_filter;

/// Backend paging API seam
pub mod client;

/// YAML configuration
pub mod config;

/// Session facade exposed to the UI layer
pub mod engine;

/// Tracing subscriber setup
pub mod logging;

// ============================================================================
// PUBLIC RE-EXPORTS
// ============================================================================

pub use client::{Credential, HistoryApi};
pub use config::Config;
pub use engine::{AlarmHistoryEngine, EngineSettings, FetchOutcome, HistorySnapshot};
pub use error::{ErrorKind, HistoryError, Result};
pub use filter::{FilterPatch, FilterState, SortOrder, StatusFilter, TimeFilter};
pub use model::{AlarmCategory, AlarmHistoryRecord, AlarmInstance, AlarmStatus, AlarmValue, Page};

#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub use client::HttpHistoryApi;

/// alarmtrail version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
