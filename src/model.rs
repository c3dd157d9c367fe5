// src/model.rs
//! Alarm history data model and its wire representation.
//!
//! The backend returns history as timestamp buckets ([`AlarmHistoryRecord`])
//! that bundle the analog and binary alarms known at that instant. Instances
//! never carry their category on the wire; it is stamped from the collection
//! they were delivered in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ALARM INSTANCE
// ============================================================================

/// Which collection of a record an instance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmCategory {
    Analog,
    Binary,
}

/// Lifecycle status reported for an alarm occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlarmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmStatus::Active => "active",
            AlarmStatus::Acknowledged => "acknowledged",
            AlarmStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampled value of the monitored parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlarmValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl fmt::Display for AlarmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Integral readings print without a trailing ".0"
            AlarmValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            AlarmValue::Number(n) => write!(f, "{}", n),
            AlarmValue::Flag(b) => write!(f, "{}", b),
            AlarmValue::Text(s) => f.write_str(s),
        }
    }
}

/// One occurrence of an alarm at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmInstance {
    pub identity: String,
    pub description: String,
    pub category: AlarmCategory,
    pub zone: Option<String>,
    pub value: AlarmValue,
    pub unit: Option<String>,
    pub set_point: Option<f64>,
    pub status: AlarmStatus,
    pub timestamp: DateTime<Utc>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceWire {
    #[serde(alias = "identity")]
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    zone: Option<String>,
    value: AlarmValue,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    set_point: Option<f64>,
    status: AlarmStatus,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    acknowledged_by: Option<String>,
    #[serde(default)]
    acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    resolved_by: Option<String>,
    #[serde(default)]
    resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    resolution_message: Option<String>,
}

impl InstanceWire {
    fn into_instance(self, category: AlarmCategory) -> AlarmInstance {
        AlarmInstance {
            identity: self.id,
            description: self.description,
            category,
            zone: self.zone,
            value: self.value,
            unit: self.unit,
            set_point: self.set_point,
            status: self.status,
            timestamp: self.timestamp,
            acknowledged_by: self.acknowledged_by,
            acknowledged_at: self.acknowledged_at,
            resolved_by: self.resolved_by,
            resolved_at: self.resolved_at,
            resolution_message: self.resolution_message,
        }
    }
}

// ============================================================================
// HISTORY RECORDS AND PAGES
// ============================================================================

/// One server-side bucket for a timestamp
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RecordWire")]
pub struct AlarmHistoryRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub analog: Vec<AlarmInstance>,
    pub binary: Vec<AlarmInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordWire {
    #[serde(alias = "_id")]
    id: String,
    timestamp: DateTime<Utc>,
    #[serde(default, alias = "analog")]
    analog_alarms: Vec<InstanceWire>,
    #[serde(default, alias = "binary")]
    binary_alarms: Vec<InstanceWire>,
}

impl From<RecordWire> for AlarmHistoryRecord {
    fn from(wire: RecordWire) -> Self {
        Self {
            id: wire.id,
            timestamp: wire.timestamp,
            analog: wire
                .analog_alarms
                .into_iter()
                .map(|a| a.into_instance(AlarmCategory::Analog))
                .collect(),
            binary: wire
                .binary_alarms
                .into_iter()
                .map(|a| a.into_instance(AlarmCategory::Binary))
                .collect(),
        }
    }
}

/// An ordered batch of records plus pagination metadata
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub records: Vec<AlarmHistoryRecord>,
    /// Continuation token, `None` once the history is exhausted
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub filtered_total: Option<u64>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
