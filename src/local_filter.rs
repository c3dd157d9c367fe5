// src/local_filter.rs
//! Client-side search and ordering over the extracted alarm trail.

use crate::filter::SortOrder;
use crate::model::AlarmInstance;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Display format searched alongside value and description
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%b %d, %Y %H:%M";

pub fn display_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

/// Final ordered view handed to the UI
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredView {
    pub instances: Vec<AlarmInstance>,
    pub total_count: usize,
}

impl FilteredView {
    /// Head of the ordered sequence, used to show the current value/status.
    pub fn summary(&self) -> Option<&AlarmInstance> {
        self.instances.first()
    }
}

pub struct LocalFilterSortEngine;

impl LocalFilterSortEngine {
    pub fn matches(instance: &AlarmInstance, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        instance.value.to_string().to_lowercase().contains(needle)
            || instance.description.to_lowercase().contains(needle)
            || display_timestamp(&instance.timestamp).to_lowercase().contains(needle)
    }

    /// Filter by `search` (case-insensitive) and order by timestamp.
    ///
    /// Ties keep their extraction order in both directions.
    pub fn apply(instances: &[AlarmInstance], search: &str, sort: SortOrder) -> FilteredView {
        let needle = search.trim().to_lowercase();
        let mut kept: Vec<AlarmInstance> = instances
            .iter()
            .filter(|i| Self::matches(i, &needle))
            .cloned()
            .collect();

        match sort {
            SortOrder::Desc => kept.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            SortOrder::Asc => kept.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        }

        FilteredView {
            total_count: kept.len(),
            instances: kept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlarmCategory, AlarmStatus, AlarmValue};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn instance(desc: &str, value: f64, minute: u32) -> AlarmInstance {
        AlarmInstance {
            identity: "zone1.hz1pv".to_string(),
            description: desc.to_string(),
            category: AlarmCategory::Analog,
            zone: Some("zone1".to_string()),
            value: AlarmValue::Number(value),
            unit: Some("°C".to_string()),
            set_point: Some(800.0),
            status: AlarmStatus::Active,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 5, 14, minute, 0).unwrap(),
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            resolution_message: None,
        }
    }

    #[test]
    fn test_empty_query_matches_all_newest_first() {
        let items = vec![instance("a", 1.0, 1), instance("b", 2.0, 3), instance("c", 3.0, 2)];
        let view = LocalFilterSortEngine::apply(&items, "", SortOrder::Desc);
        let order: Vec<_> = view.instances.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
        assert_eq!(view.total_count, 3);
        assert_eq!(view.summary().unwrap().description, "b");
    }

    #[test]
    fn test_search_is_case_insensitive_over_description() {
        let items = vec![instance("Furnace OVERHEAT", 1.0, 1), instance("burner trip", 2.0, 2)];
        let view = LocalFilterSortEngine::apply(&items, "overheat", SortOrder::Desc);
        assert_eq!(view.total_count, 1);
        assert_eq!(view.instances[0].description, "Furnace OVERHEAT");
    }

    #[test]
    fn test_search_matches_value_and_display_timestamp() {
        let items = vec![instance("a", 812.5, 1), instance("b", 790.0, 45)];
        assert_eq!(LocalFilterSortEngine::apply(&items, "812.5", SortOrder::Asc).total_count, 1);

        let view = LocalFilterSortEngine::apply(&items, "14:45", SortOrder::Asc);
        assert_eq!(view.instances[0].description, "b");

        assert_eq!(LocalFilterSortEngine::apply(&items, "mar 05", SortOrder::Asc).total_count, 2);
    }

    #[test]
    fn test_no_match_has_no_summary() {
        let items = vec![instance("a", 1.0, 1)];
        let view = LocalFilterSortEngine::apply(&items, "nothing here", SortOrder::Desc);
        assert!(view.summary().is_none());
        assert_eq!(view.total_count, 0);
    }

    #[test]
    fn test_display_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(display_timestamp(&ts), "Mar 05, 2025 14:30");
    }

    fn arb_items() -> impl Strategy<Value = Vec<AlarmInstance>> {
        prop::collection::vec((0u32..5, "[a-c]{1,3}"), 0..40).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(n, (minute, desc))| instance(&format!("{}-{}", desc, n), n as f64, minute))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_apply_is_idempotent(items in arb_items(), query in "[a-c]{0,2}", asc in any::<bool>()) {
            let sort = if asc { SortOrder::Asc } else { SortOrder::Desc };
            let once = LocalFilterSortEngine::apply(&items, &query, sort);
            let twice = LocalFilterSortEngine::apply(&items, &query, sort);
            prop_assert_eq!(&once, &twice);

            let reapplied = LocalFilterSortEngine::apply(&once.instances, &query, sort);
            prop_assert_eq!(once, reapplied);
        }

        #[test]
        fn prop_ties_keep_extraction_order(items in arb_items(), asc in any::<bool>()) {
            let sort = if asc { SortOrder::Asc } else { SortOrder::Desc };
            let view = LocalFilterSortEngine::apply(&items, "", sort);
            // Value holds the extraction index
            for pair in view.instances.windows(2) {
                if pair[0].timestamp == pair[1].timestamp {
                    let (AlarmValue::Number(a), AlarmValue::Number(b)) = (&pair[0].value, &pair[1].value) else {
                        unreachable!()
                    };
                    prop_assert!(a < b);
                }
            }
        }
    }
}
