//! Trace events.
//!
//! Every observable occurrence in the pipeline produces an [`Event`]. The CLI
//! sink renders them to stdout; tests collect them in memory and assert on
//! the rendered lines. The `Display` wording is human-oriented, but each
//! variant carries a fixed token (`Inserted`, `Printed`, `Cancelled`, ...)
//! that downstream consumers may key on.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmState, ChangeField};

/// A row of a view listing: one active alarm and its assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRow {
    pub id: u32,
    pub group: u32,
    pub state: AlarmState,
    pub worker: Option<u32>,
}

/// Every observable state change in the system produces an Event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A start request was admitted to the active table.
    Inserted {
        id: u32,
        group: u32,
        interval_s: i64,
        expires_at: i64,
        message: String,
        at: i64,
    },
    /// The dispatcher brought up a new display worker for a group.
    WorkerSpawned {
        worker: u32,
        group: u32,
        alarm: u32,
        at: i64,
    },
    /// An alarm was handed to a display worker.
    Assigned {
        alarm: u32,
        worker: u32,
        group: u32,
        at: i64,
    },
    /// A periodic emission.
    Printed {
        alarm: u32,
        worker: u32,
        group: u32,
        message: String,
        at: i64,
    },
    /// The change applier altered a field of an active alarm.
    Changed {
        alarm: u32,
        group: u32,
        field: ChangeField,
        at: i64,
    },
    /// The carrying worker first printed after a message/interval change.
    ChangeObserved {
        alarm: u32,
        worker: u32,
        field: ChangeField,
        at: i64,
    },
    /// The carrying worker released an alarm whose group changed.
    GroupMoveStopped {
        alarm: u32,
        worker: u32,
        new_group: u32,
        at: i64,
    },
    /// A cancelled alarm was destroyed by its owner.
    Cancelled { alarm: u32, group: u32, at: i64 },
    /// An expired alarm was destroyed by its owner.
    Expired { alarm: u32, group: u32, at: i64 },
    /// An alarm entered suspension.
    Suspended {
        alarm: u32,
        group: u32,
        remaining_s: i64,
        at: i64,
    },
    /// The carrying worker noticed a suspension (one-shot notice).
    SuspensionObserved { alarm: u32, worker: u32, at: i64 },
    /// A suspended alarm was resumed.
    Reactivated {
        alarm: u32,
        group: u32,
        expires_at: i64,
        at: i64,
    },
    /// A display worker ran out of alarms and exited.
    WorkerRetired { worker: u32, group: u32, at: i64 },
    /// A view request was serviced.
    Viewed {
        rows: Vec<ViewRow>,
        requested_at: i64,
        at: i64,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Inserted {
                id,
                group,
                interval_s,
                expires_at,
                message,
                at,
            } => write!(
                f,
                "Start_Alarm({id}) Request Inserted at {at}: Group({group}) \
                 Interval {interval_s} Expires {expires_at} {message}"
            ),
            Event::WorkerSpawned {
                worker,
                group,
                alarm,
                at,
            } => write!(
                f,
                "Created New Display Thread({worker}) For Alarm({alarm}) at {at}: Group({group})"
            ),
            Event::Assigned {
                alarm,
                worker,
                group,
                at,
            } => write!(
                f,
                "Alarm({alarm}) Assigned to Display Thread({worker}) at {at}: Group({group})"
            ),
            Event::Printed {
                alarm,
                worker,
                group,
                message,
                at,
            } => write!(
                f,
                "Alarm({alarm}) Printed by Display Thread({worker}) at {at}: Group({group}) {message}"
            ),
            Event::Changed {
                alarm,
                group,
                field,
                at,
            } => match field {
                ChangeField::Group(g) => write!(
                    f,
                    "Alarm({alarm}) Changed at {at}: New Group({g})"
                ),
                ChangeField::Message(m) => write!(
                    f,
                    "Alarm({alarm}) Changed at {at}: Group({group}) New Message({m})"
                ),
                ChangeField::Interval(i) => write!(
                    f,
                    "Alarm({alarm}) Changed at {at}: Group({group}) New Interval({i})"
                ),
            },
            Event::ChangeObserved {
                alarm,
                worker,
                field,
                at,
            } => match field {
                ChangeField::Group(g) => write!(
                    f,
                    "Display Thread({worker}) Observed Changed Group({g}) of Alarm({alarm}) at {at}"
                ),
                ChangeField::Message(m) => write!(
                    f,
                    "Display Thread({worker}) Starts to Print Changed Message of \
                     Alarm({alarm}) at {at}: {m}"
                ),
                ChangeField::Interval(i) => write!(
                    f,
                    "Display Thread({worker}) Starts to Print at Changed Interval({i}) of \
                     Alarm({alarm}) at {at}"
                ),
            },
            Event::GroupMoveStopped {
                alarm,
                worker,
                new_group,
                at,
            } => write!(
                f,
                "Display Thread({worker}) stopped printing (changed group) for \
                 Alarm({alarm}) at {at}: Group({new_group})"
            ),
            Event::Cancelled { alarm, group, at } => {
                write!(f, "Alarm({alarm}) Cancelled at {at}: Group({group})")
            }
            Event::Expired { alarm, group, at } => {
                write!(f, "Alarm({alarm}) Expired at {at}: Group({group})")
            }
            Event::Suspended {
                alarm,
                group,
                remaining_s,
                at,
            } => write!(
                f,
                "Alarm({alarm}) Suspended at {at}: Group({group}) Remaining {remaining_s}s"
            ),
            Event::SuspensionObserved { alarm, worker, at } => write!(
                f,
                "Display Thread({worker}) Skipping Suspended Alarm({alarm}) at {at}"
            ),
            Event::Reactivated {
                alarm,
                group,
                expires_at,
                at,
            } => write!(
                f,
                "Alarm({alarm}) Reactivated at {at}: Group({group}) Expires {expires_at}"
            ),
            Event::WorkerRetired { worker, group, at } => write!(
                f,
                "No More Active Alarms in Group({group}): Display Thread({worker}) exiting at {at}"
            ),
            Event::Viewed {
                rows,
                requested_at,
                at,
            } => {
                writeln!(f, "View Alarms at {at}:")?;
                for (n, row) in rows.iter().enumerate() {
                    write!(
                        f,
                        "{}. Alarm({}): Group({}) State({}) ",
                        n + 1,
                        row.id,
                        row.group,
                        row.state
                    )?;
                    match row.worker {
                        Some(w) => writeln!(f, "Display Thread({w})")?,
                        None => writeln!(f, "not assigned")?,
                    }
                }
                write!(
                    f,
                    "{} Alarm Requests Viewed at {at} by View Thread (request {requested_at})",
                    rows.len()
                )
            }
        }
    }
}

/// Where emitted events go. The CLI installs a printing sink; tests a
/// collecting one.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: Event);
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// All events rendered through `Display`, in order.
    pub fn rendered(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.to_string()).collect()
    }

    /// Drain the collected events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.lock().push(event);
    }
}
