//! The alarm entity and its state machine.
//!
//! An alarm progresses `Active -> (Suspended | Cancelled | Expired)` and is
//! destroyed by whichever side owns it at that moment. All transitions happen
//! under the store lock; the methods here are pure state arithmetic and leave
//! locking to the caller.

use serde::{Deserialize, Serialize};

use crate::request::{ChangeRecord, StartRequest};
use crate::MESSAGE_MAX;

/// Lifecycle state of an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    Active,
    Suspended,
    Cancelled,
    Expired,
}

impl std::fmt::Display for AlarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlarmState::Active => "Active",
            AlarmState::Suspended => "Suspended",
            AlarmState::Cancelled => "Cancelled",
            AlarmState::Expired => "Expired",
        };
        f.write_str(name)
    }
}

/// Who may destroy the alarm right now. Flipped only under the store lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "owner", content = "worker", rename_all = "lowercase")]
pub enum Owner {
    Store,
    Worker(u32),
}

/// Mutations applied by the change applier but not yet observed by the
/// carrying display worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFlags {
    pub group_changed: bool,
    pub message_changed: bool,
    pub interval_changed: bool,
}

/// A field actually altered by a change request, with its new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum ChangeField {
    Group(u32),
    Message(String),
    Interval(i64),
}

/// A periodic print job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: u32,
    pub group: u32,
    /// Total lifetime in seconds from admission.
    pub duration_s: i64,
    /// Print period in seconds.
    pub interval_s: i64,
    /// Up to [`MESSAGE_MAX`] bytes of text.
    pub message: String,
    /// Admission time (epoch seconds). Mutations older than this are stale.
    pub created_at: i64,
    /// Deadline; frozen while suspended, re-anchored on group change.
    pub expires_at: i64,
    pub state: AlarmState,
    /// Seconds left to expiry, captured at the moment of suspension.
    pub remaining_on_suspend_s: Option<i64>,
    /// 0 sentinel = never printed.
    pub last_printed_at: i64,
    pub flags: PendingFlags,
    pub owner: Owner,
    /// Worker that most recently released the alarm, preferred on reassignment.
    pub last_worker: Option<u32>,
    /// The carrying worker has already printed the one-shot suspension notice.
    pub suspend_notice_sent: bool,
    /// Failed worker-spawn attempts while this alarm waited for assignment.
    pub spawn_attempts: u32,
    /// Admission sequence number; snapshots enumerate in this order.
    pub seq: u64,
}

/// Clamp a message to [`MESSAGE_MAX`] bytes, cutting on a char boundary.
fn clamp_message(mut message: String) -> String {
    if message.len() > MESSAGE_MAX {
        let mut end = MESSAGE_MAX;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    message
}

impl Alarm {
    /// Admit a start request at `now`. The message is clamped to
    /// [`MESSAGE_MAX`] bytes.
    pub fn admit(req: StartRequest, now: i64, seq: u64) -> Self {
        Self {
            id: req.id,
            group: req.group,
            duration_s: req.duration_s,
            interval_s: req.interval_s,
            message: clamp_message(req.message),
            created_at: now,
            expires_at: now + req.duration_s,
            state: AlarmState::Active,
            remaining_on_suspend_s: None,
            last_printed_at: 0,
            flags: PendingFlags::default(),
            owner: Owner::Store,
            last_worker: None,
            suspend_notice_sent: false,
            spawn_attempts: 0,
            seq,
        }
    }

    pub fn assigned_worker(&self) -> Option<u32> {
        match self.owner {
            Owner::Worker(w) => Some(w),
            Owner::Store => None,
        }
    }

    /// Whether the alarm has outlived its deadline. Suspension freezes the
    /// deadline, so a suspended alarm never expires.
    pub fn is_expired(&self, now: i64) -> bool {
        self.state == AlarmState::Active && now >= self.expires_at
    }

    /// Whether a periodic emission is owed at `now`.
    pub fn due(&self, now: i64) -> bool {
        self.last_printed_at == 0 || now - self.last_printed_at >= self.interval_s
    }

    /// Waiting for the dispatcher: unassigned and still printable.
    pub fn needs_assignment(&self) -> bool {
        self.owner == Owner::Store
            && matches!(self.state, AlarmState::Active | AlarmState::Suspended)
    }

    /// Suspend, capturing the remaining lifetime. Idempotent: suspending a
    /// non-`Active` alarm is a no-op and returns `None`.
    pub fn suspend(&mut self, now: i64) -> Option<i64> {
        if self.state != AlarmState::Active {
            return None;
        }
        let remaining = self.expires_at - now;
        self.state = AlarmState::Suspended;
        self.remaining_on_suspend_s = Some(remaining);
        self.suspend_notice_sent = false;
        Some(remaining)
    }

    /// Resume a suspended alarm. Re-anchors the deadline from the captured
    /// remaining time and forces an immediate next print. Returns the new
    /// deadline, or `None` if the alarm was not suspended.
    pub fn resume(&mut self, now: i64) -> Option<i64> {
        if self.state != AlarmState::Suspended {
            return None;
        }
        let remaining = self.remaining_on_suspend_s.take().unwrap_or(0);
        self.state = AlarmState::Active;
        self.expires_at = now + remaining;
        self.last_printed_at = now - self.interval_s;
        Some(self.expires_at)
    }

    /// Apply a change record field by field, marking the pending flags the
    /// carrying worker will observe. Only a group change re-anchors the
    /// deadline; it does so from the (possibly just updated) duration.
    pub fn apply_change(&mut self, rec: &ChangeRecord, now: i64) -> Vec<ChangeField> {
        let mut applied = Vec::new();
        let message = clamp_message(rec.message.clone());
        if message != self.message {
            self.message = message;
            self.flags.message_changed = true;
            applied.push(ChangeField::Message(self.message.clone()));
        }
        if rec.interval_s != self.interval_s {
            self.interval_s = rec.interval_s;
            self.flags.interval_changed = true;
            applied.push(ChangeField::Interval(self.interval_s));
        }
        self.duration_s = rec.duration_s;
        if rec.group != self.group {
            self.group = rec.group;
            self.flags.group_changed = true;
            self.expires_at = now + self.duration_s;
            applied.push(ChangeField::Group(self.group));
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(id: u32, group: u32, duration_s: i64, interval_s: i64) -> StartRequest {
        StartRequest {
            id,
            group,
            duration_s,
            interval_s,
            message: "m".into(),
            timestamp: 0,
        }
    }

    #[test]
    fn admit_anchors_deadline() {
        let a = Alarm::admit(start(1, 7, 5, 1), 100, 0);
        assert_eq!(a.created_at, 100);
        assert_eq!(a.expires_at, 105);
        assert_eq!(a.state, AlarmState::Active);
        assert_eq!(a.owner, Owner::Store);
        assert!(a.due(100));
    }

    #[test]
    fn suspend_freezes_remaining_time() {
        let mut a = Alarm::admit(start(1, 5, 10, 1), 0, 0);
        assert_eq!(a.suspend(3), Some(7));
        assert_eq!(a.state, AlarmState::Suspended);
        // Deadline passes on the wall clock but the alarm does not expire.
        assert!(!a.is_expired(12));
        // Second suspend is a no-op.
        assert_eq!(a.suspend(5), None);
        assert_eq!(a.remaining_on_suspend_s, Some(7));
    }

    #[test]
    fn resume_reanchors_and_forces_print() {
        let mut a = Alarm::admit(start(1, 5, 10, 2), 0, 0);
        a.suspend(3);
        assert_eq!(a.resume(13), Some(20));
        assert_eq!(a.state, AlarmState::Active);
        assert_eq!(a.remaining_on_suspend_s, None);
        assert!(a.due(13));
        // Resuming an active alarm is a no-op.
        assert_eq!(a.resume(14), None);
    }

    #[test]
    fn message_change_does_not_reanchor() {
        let mut a = Alarm::admit(start(1, 9, 20, 2), 0, 0);
        let rec = ChangeRecord {
            id: 1,
            group: 9,
            duration_s: 20,
            interval_s: 2,
            message: "new".into(),
            timestamp: 5,
        };
        let applied = a.apply_change(&rec, 5);
        assert_eq!(applied, vec![ChangeField::Message("new".into())]);
        assert!(a.flags.message_changed);
        assert!(!a.flags.group_changed);
        assert_eq!(a.expires_at, 20);
    }

    #[test]
    fn group_change_reanchors_with_new_duration() {
        let mut a = Alarm::admit(start(1, 9, 20, 2), 0, 0);
        let rec = ChangeRecord {
            id: 1,
            group: 4,
            duration_s: 30,
            interval_s: 2,
            message: "m".into(),
            timestamp: 5,
        };
        let applied = a.apply_change(&rec, 5);
        assert_eq!(applied, vec![ChangeField::Group(4)]);
        assert!(a.flags.group_changed);
        assert_eq!(a.group, 4);
        assert_eq!(a.duration_s, 30);
        assert_eq!(a.expires_at, 35);
    }

    #[test]
    fn identical_change_applies_nothing() {
        let mut a = Alarm::admit(start(1, 9, 20, 2), 0, 0);
        let rec = ChangeRecord {
            id: 1,
            group: 9,
            duration_s: 20,
            interval_s: 2,
            message: "m".into(),
            timestamp: 5,
        };
        assert!(a.apply_change(&rec, 5).is_empty());
        assert_eq!(a.flags, PendingFlags::default());
    }

    #[test]
    fn admit_clamps_oversized_messages() {
        let mut req = start(1, 7, 5, 1);
        req.message = "x".repeat(MESSAGE_MAX + 40);
        let a = Alarm::admit(req, 0, 0);
        assert_eq!(a.message.len(), MESSAGE_MAX);
    }

    #[test]
    fn clamp_cuts_on_a_char_boundary() {
        let mut req = start(1, 7, 5, 1);
        // 3-byte chars: 42 of them fit in 128 bytes, the 43rd must go whole.
        req.message = "日".repeat(100);
        let a = Alarm::admit(req, 0, 0);
        assert_eq!(a.message.len(), 126);
        assert_eq!(a.message.chars().count(), 42);
    }

    #[test]
    fn change_compares_against_the_clamped_message() {
        let mut req = start(1, 9, 20, 2);
        req.message = "x".repeat(MESSAGE_MAX + 40);
        let mut a = Alarm::admit(req, 0, 0);

        // Differs only beyond the cap: not a change.
        let mut rec = ChangeRecord {
            id: 1,
            group: 9,
            duration_s: 20,
            interval_s: 2,
            message: "x".repeat(MESSAGE_MAX + 80),
            timestamp: 5,
        };
        assert!(a.apply_change(&rec, 5).is_empty());
        assert!(!a.flags.message_changed);

        // A genuinely different oversized message lands clamped.
        rec.message = "y".repeat(MESSAGE_MAX + 80);
        let applied = a.apply_change(&rec, 6);
        assert_eq!(applied, vec![ChangeField::Message("y".repeat(MESSAGE_MAX))]);
        assert_eq!(a.message.len(), MESSAGE_MAX);
    }

    #[test]
    fn due_respects_interval() {
        let mut a = Alarm::admit(start(1, 9, 20, 3), 0, 0);
        assert!(a.due(0));
        a.last_printed_at = 4;
        assert!(!a.due(5));
        assert!(a.due(7));
    }
}
