//! The request store: the shared mutable world.
//!
//! One mutex guards everything the threads share: the active alarm table,
//! the per-kind pending queues, and the display worker registry. Handlers
//! take the lock for one short pass and never hold it across a sleep.
//!
//! The table owns every live [`Alarm`] for its whole life; workers hold alarm
//! *ids* in their slots and the alarm's `owner` tag says who may destroy it.
//! Ownership flips and destruction happen only through the methods here, so
//! they are serialized by the lock.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::alarm::{Alarm, AlarmState, Owner};
use crate::error::StoreError;
use crate::events::ViewRow;
use crate::request::{ChangeRecord, StartRequest, ToggleKind};
use crate::MAX_ALARMS_PER_WORKER;

/// A queued mutation that names its target and the second it was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamped {
    pub id: u32,
    pub timestamp: i64,
}

/// Registry entry for one display worker: its group and the ids it carries,
/// in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSlots {
    pub group: u32,
    pub alarms: Vec<u32>,
}

impl WorkerSlots {
    pub fn has_capacity(&self) -> bool {
        self.alarms.len() < MAX_ALARMS_PER_WORKER
    }
}

/// Everything guarded by the store lock.
#[derive(Debug, Default)]
pub struct World {
    next_seq: u64,
    next_worker_id: u32,
    active: BTreeMap<u32, Alarm>,
    changes: VecDeque<ChangeRecord>,
    cancels: VecDeque<Stamped>,
    toggles: VecDeque<(ToggleKind, Stamped)>,
    views: VecDeque<i64>,
    workers: BTreeMap<u32, WorkerSlots>,
}

impl World {
    // ── Admission ────────────────────────────────────────────────────

    /// Admit a start request. Fails if the id is already active.
    pub fn insert_start(&mut self, req: StartRequest, now: i64) -> Result<&Alarm, StoreError> {
        if self.active.contains_key(&req.id) {
            return Err(StoreError::DuplicateId(req.id));
        }
        let id = req.id;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.active.insert(id, Alarm::admit(req, now, seq));
        Ok(&self.active[&id])
    }

    // ── Pending queues ───────────────────────────────────────────────

    pub fn enqueue_change(&mut self, record: ChangeRecord) {
        self.changes.push_back(record);
    }

    pub fn enqueue_cancel(&mut self, id: u32, timestamp: i64) {
        self.cancels.push_back(Stamped { id, timestamp });
    }

    pub fn enqueue_toggle(&mut self, kind: ToggleKind, id: u32, timestamp: i64) {
        self.toggles.push_back((kind, Stamped { id, timestamp }));
    }

    pub fn enqueue_view(&mut self, timestamp: i64) {
        self.views.push_back(timestamp);
    }

    pub fn take_changes(&mut self) -> Vec<ChangeRecord> {
        std::mem::take(&mut self.changes).into()
    }

    pub fn take_cancels(&mut self) -> Vec<Stamped> {
        std::mem::take(&mut self.cancels).into()
    }

    pub fn take_toggles(&mut self) -> Vec<(ToggleKind, Stamped)> {
        std::mem::take(&mut self.toggles).into()
    }

    pub fn take_views(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.views).into()
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Find the live alarm a mutation with timestamp `ts` targets. Matches
    /// only an alarm admitted strictly before `ts` (the staleness rule);
    /// alarms already cancelled or expired are not valid targets.
    pub fn find_target(&mut self, id: u32, ts: i64) -> Result<&mut Alarm, StoreError> {
        match self.active.get_mut(&id) {
            Some(alarm)
                if alarm.created_at < ts
                    && matches!(alarm.state, AlarmState::Active | AlarmState::Suspended) =>
            {
                Ok(alarm)
            }
            _ => Err(StoreError::UnknownTarget { id, timestamp: ts }),
        }
    }

    pub fn alarm(&self, id: u32) -> Option<&Alarm> {
        self.active.get(&id)
    }

    pub fn alarm_mut(&mut self, id: u32) -> Option<&mut Alarm> {
        self.active.get_mut(&id)
    }

    /// Live alarms in admission order.
    pub fn alarms(&self) -> Vec<&Alarm> {
        let mut alarms: Vec<&Alarm> = self.active.values().collect();
        alarms.sort_by_key(|a| a.seq);
        alarms
    }

    /// The oldest-admitted alarm still waiting for a worker.
    pub fn next_unassigned(&self) -> Option<u32> {
        self.active
            .values()
            .filter(|a| a.needs_assignment())
            .min_by_key(|a| a.seq)
            .map(|a| a.id)
    }

    /// Listing rows for a view request, in admission order.
    pub fn snapshot(&self) -> Vec<ViewRow> {
        self.alarms()
            .into_iter()
            .filter(|a| matches!(a.state, AlarmState::Active | AlarmState::Suspended))
            .map(|a| ViewRow {
                id: a.id,
                group: a.group,
                state: a.state,
                worker: a.assigned_worker(),
            })
            .collect()
    }

    // ── Worker registry ──────────────────────────────────────────────

    /// Allocate a registry entry for a new worker bound to `group`.
    pub fn register_worker(&mut self, group: u32) -> u32 {
        self.next_worker_id += 1;
        let id = self.next_worker_id;
        self.workers.insert(
            id,
            WorkerSlots {
                group,
                alarms: Vec::with_capacity(MAX_ALARMS_PER_WORKER),
            },
        );
        id
    }

    /// Drop a registry entry whose thread never came up.
    pub fn unregister_worker(&mut self, worker: u32) {
        self.workers.remove(&worker);
    }

    pub fn worker(&self, worker: u32) -> Option<&WorkerSlots> {
        self.workers.get(&worker)
    }

    pub fn worker_ids(&self) -> Vec<u32> {
        self.workers.keys().copied().collect()
    }

    pub fn workers(&self) -> &BTreeMap<u32, WorkerSlots> {
        &self.workers
    }

    /// The lowest-numbered worker of `group` with a free slot.
    pub fn worker_with_capacity(&self, group: u32) -> Option<u32> {
        self.workers
            .iter()
            .find(|(_, w)| w.group == group && w.has_capacity())
            .map(|(id, _)| *id)
    }

    /// Hand an alarm to a worker: flips the owner tag and fills a slot.
    pub fn assign(&mut self, alarm_id: u32, worker: u32) -> bool {
        let Some(slots) = self.workers.get_mut(&worker) else {
            return false;
        };
        let Some(alarm) = self.active.get_mut(&alarm_id) else {
            return false;
        };
        debug_assert!(slots.has_capacity());
        debug_assert_eq!(alarm.owner, Owner::Store);
        slots.alarms.push(alarm_id);
        alarm.owner = Owner::Worker(worker);
        true
    }

    /// A worker gives an alarm back for reassignment (group change). The
    /// alarm remembers the releasing worker so the dispatcher can prefer it.
    pub fn release_to_store(&mut self, alarm_id: u32, worker: u32) {
        if let Some(slots) = self.workers.get_mut(&worker) {
            slots.alarms.retain(|id| *id != alarm_id);
        }
        if let Some(alarm) = self.active.get_mut(&alarm_id) {
            alarm.owner = Owner::Store;
            alarm.last_worker = Some(worker);
        }
    }

    /// Drop one id from a worker's slot list without touching the alarm.
    pub fn clear_slot(&mut self, worker: u32, alarm_id: u32) {
        if let Some(slots) = self.workers.get_mut(&worker) {
            slots.alarms.retain(|id| *id != alarm_id);
        }
    }

    /// Remove a retiring worker's registry entry.
    pub fn retire_worker(&mut self, worker: u32) -> Option<WorkerSlots> {
        self.workers.remove(&worker)
    }

    // ── Destruction ──────────────────────────────────────────────────

    /// Remove an alarm from the world entirely. Only the current owner calls
    /// this; any slot still naming the id is scrubbed.
    pub fn destroy(&mut self, alarm_id: u32) -> Option<Alarm> {
        let alarm = self.active.remove(&alarm_id)?;
        if let Owner::Worker(w) = alarm.owner {
            if let Some(slots) = self.workers.get_mut(&w) {
                slots.alarms.retain(|id| *id != alarm_id);
            }
        }
        Some(alarm)
    }

    /// Remove every unassigned alarm that has run out: past its deadline, or
    /// given up on by the dispatcher. Assigned alarms are left for their
    /// worker to observe.
    pub fn remove_expired(&mut self, now: i64) -> Vec<Alarm> {
        let doomed: Vec<u32> = self
            .active
            .values()
            .filter(|a| {
                a.owner == Owner::Store && (a.is_expired(now) || a.state == AlarmState::Expired)
            })
            .map(|a| a.id)
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| self.active.remove(&id))
            .collect()
    }
}

/// The mutex around [`World`].
#[derive(Debug, Default)]
pub struct Store {
    world: Mutex<World>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the store lock. A poisoned lock is recovered: passes keep the
    /// world consistent before every emission, so the state is usable even
    /// if another thread panicked mid-pass.
    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
