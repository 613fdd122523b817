//! Request values handed from the prompt to the consumer.
//!
//! The prompt parses each input line into one of these values and pushes it
//! through the bounded buffer; the consumer applies it to the store. Every
//! request carries the wall-clock second at which it was typed, which is what
//! the staleness rule compares against a target's admission time.

use serde::{Deserialize, Serialize};

/// Payload of a `Start_Alarm` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub id: u32,
    pub group: u32,
    pub duration_s: i64,
    pub interval_s: i64,
    pub message: String,
    pub timestamp: i64,
}

/// Payload of a `Change_Alarm` request; carried on the pending change queue
/// until the change applier picks it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: u32,
    pub group: u32,
    pub duration_s: i64,
    pub interval_s: i64,
    pub message: String,
    pub timestamp: i64,
}

/// Which way a suspend/resume toggle goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleKind {
    Suspend,
    Resume,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    Start(StartRequest),
    Change(ChangeRecord),
    Cancel { id: u32, timestamp: i64 },
    Suspend { id: u32, timestamp: i64 },
    Resume { id: u32, timestamp: i64 },
    View { timestamp: i64 },
}

impl Request {
    /// Request kind name, for trace records.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Start(_) => "Start_Alarm",
            Request::Change(_) => "Change_Alarm",
            Request::Cancel { .. } => "Cancel_Alarm",
            Request::Suspend { .. } => "Suspend_Alarm",
            Request::Resume { .. } => "Reactivate_Alarm",
            Request::View { .. } => "View_Alarms",
        }
    }

    /// The alarm id the request targets, if any.
    pub fn target_id(&self) -> Option<u32> {
        match self {
            Request::Start(r) => Some(r.id),
            Request::Change(r) => Some(r.id),
            Request::Cancel { id, .. }
            | Request::Suspend { id, .. }
            | Request::Resume { id, .. } => Some(*id),
            Request::View { .. } => None,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Request::Start(r) => r.timestamp,
            Request::Change(r) => r.timestamp,
            Request::Cancel { timestamp, .. }
            | Request::Suspend { timestamp, .. }
            | Request::Resume { timestamp, .. }
            | Request::View { timestamp } => *timestamp,
        }
    }
}
