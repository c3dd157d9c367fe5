// tests/common/mod.rs
//! Scripted backend and fixtures shared by the integration tests

#![allow(dead_code)]

use alarmtrail::query::RequestDescriptor;
use alarmtrail::{
    AlarmCategory, AlarmHistoryRecord, AlarmInstance, AlarmStatus, AlarmValue, Credential, HistoryApi,
    Page, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

type Key = (String, Option<String>);

/// Backend answering from a script keyed by `(identity, cursor)`.
///
/// Each key holds a queue of `(delay, response)`; the last entry repeats.
#[derive(Default)]
pub struct ScriptedApi {
    script: Mutex<HashMap<Key, VecDeque<(Duration, Result<Page>)>>>,
    log: Mutex<Vec<RequestDescriptor>>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, identity: &str, cursor: Option<&str>, delay_ms: u64, response: Result<Page>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry((identity.to_string(), cursor.map(str::to_string)))
            .or_default()
            .push_back((Duration::from_millis(delay_ms), response));
        self
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.log.lock().unwrap().clone()
    }

    /// Bearer token sent with each request, in request order
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl HistoryApi for ScriptedApi {
    async fn fetch_page(&self, request: &RequestDescriptor, credential: &Credential) -> Result<Page> {
        self.log.lock().unwrap().push(request.clone());
        self.tokens.lock().unwrap().push(credential.token().map(str::to_string));

        let (delay, response) = {
            let mut script = self.script.lock().unwrap();
            let key = (request.identity.clone(), request.cursor.clone());
            let queue = script
                .get_mut(&key)
                .unwrap_or_else(|| panic!("no scripted response for {:?}", key));
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        };

        tokio::time::sleep(delay).await;
        response
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
}

pub fn instance(identity: &str, category: AlarmCategory, description: &str, ts: DateTime<Utc>) -> AlarmInstance {
    AlarmInstance {
        identity: identity.to_string(),
        description: description.to_string(),
        category,
        zone: Some("zone1".to_string()),
        value: match category {
            AlarmCategory::Analog => AlarmValue::Number(812.5),
            AlarmCategory::Binary => AlarmValue::Flag(true),
        },
        unit: Some("°C".to_string()),
        set_point: Some(800.0),
        status: AlarmStatus::Active,
        timestamp: ts,
        acknowledged_by: None,
        acknowledged_at: None,
        resolved_by: None,
        resolved_at: None,
        resolution_message: None,
    }
}

pub fn record(id: &str, ts: DateTime<Utc>, analog: Vec<AlarmInstance>, binary: Vec<AlarmInstance>) -> AlarmHistoryRecord {
    AlarmHistoryRecord {
        id: id.to_string(),
        timestamp: ts,
        analog,
        binary,
    }
}

pub fn page(records: Vec<AlarmHistoryRecord>, cursor: Option<&str>) -> Page {
    Page {
        records,
        next_cursor: cursor.map(str::to_string),
        filtered_total: None,
    }
}

/// Page holding one record with a single analog instance of `identity`
pub fn single(identity: &str, description: &str, ts: DateTime<Utc>, cursor: Option<&str>) -> Page {
    page(
        vec![record(
            &format!("{}@{}", identity, ts),
            ts,
            vec![instance(identity, AlarmCategory::Analog, description, ts)],
            vec![],
        )],
        cursor,
    )
}
