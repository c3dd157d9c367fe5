// src/extractor.rs
//! Pulls the occurrences of one alarm identity out of mixed history records.

use crate::model::{AlarmInstance, AlarmHistoryRecord, Page};
use serde::{Deserialize, Serialize};

/// How a record entry's identity is compared with the target identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMatch {
    Exact,
    /// Entry identity contains the target (composite ids such as `zone1.hz1pv`)
    #[default]
    Contains,
}

impl IdentityMatch {
    fn matches(&self, candidate: &str, target: &str) -> bool {
        match self {
            IdentityMatch::Exact => candidate == target,
            IdentityMatch::Contains => candidate.contains(target),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordExtractor {
    target: String,
    mode: IdentityMatch,
}

impl RecordExtractor {
    pub fn new(target: impl Into<String>, mode: IdentityMatch) -> Self {
        Self { target: target.into(), mode }
    }

    /// Flattened instances of every page, in page-arrival then record order.
    pub fn extract(&self, pages: &[Page]) -> Vec<AlarmInstance> {
        pages.iter().flat_map(|page| self.extract_page(page)).collect()
    }

    pub fn extract_page(&self, page: &Page) -> Vec<AlarmInstance> {
        page.records
            .iter()
            .flat_map(|record| self.extract_record(record))
            .collect()
    }

    /// At most one analog and one binary instance, in that order.
    pub fn extract_record(&self, record: &AlarmHistoryRecord) -> Vec<AlarmInstance> {
        [&record.analog, &record.binary]
            .into_iter()
            .filter_map(|collection| self.find(collection))
            .cloned()
            .collect()
    }

    // An exact hit wins over an earlier substring hit in the same collection.
    fn find<'a>(&self, collection: &'a [AlarmInstance]) -> Option<&'a AlarmInstance> {
        collection
            .iter()
            .find(|a| a.identity == self.target)
            .or_else(|| collection.iter().find(|a| self.mode.matches(&a.identity, &self.target)))
    }
}
