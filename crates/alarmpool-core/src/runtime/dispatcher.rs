//! Dispatcher: assigns admitted alarms to display workers.
//!
//! Each sweep takes the oldest unassigned alarm and finds it a worker:
//! the one that last carried it (if it still fits), any worker of the same
//! group with a free slot, or a freshly spawned one. Spawning and assignment
//! happen under one hold of the store lock, so a new worker's first pass
//! always sees its slots populated.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::warn;

use crate::alarm::AlarmState;
use crate::clock::Clock;
use crate::events::{Event, EventSink};
use crate::store::{Store, World};
use crate::MAX_SPAWN_ATTEMPTS;

/// Brings display worker threads into existence. The supervisor's
/// implementation spawns OS threads; tests record the request and succeed
/// (or fail) on demand.
pub trait WorkerSpawner {
    fn spawn(&mut self, worker: u32, group: u32) -> std::io::Result<()>;
}

/// Spawner that does nothing and always succeeds. Useful when passes are
/// driven by hand and no worker threads should exist.
#[derive(Debug, Default)]
pub struct NoopSpawner;

impl WorkerSpawner for NoopSpawner {
    fn spawn(&mut self, _worker: u32, _group: u32) -> std::io::Result<()> {
        Ok(())
    }
}

/// One dispatcher sweep: assign at most one alarm.
pub fn sweep(
    world: &mut World,
    now: i64,
    sink: &dyn EventSink,
    spawner: &mut dyn WorkerSpawner,
) {
    let Some(id) = world.next_unassigned() else {
        return;
    };
    let Some(alarm) = world.alarm(id) else {
        return;
    };
    let group = alarm.group;
    let last_worker = alarm.last_worker;

    // Prefer the worker that carried the alarm before its group changed
    // back, then any same-group worker with room.
    let reusable = last_worker
        .filter(|w| {
            world
                .worker(*w)
                .map(|slots| slots.group == group && slots.has_capacity())
                .unwrap_or(false)
        })
        .or_else(|| world.worker_with_capacity(group));

    let worker = match reusable {
        Some(worker) => worker,
        None => {
            let worker = world.register_worker(group);
            match spawner.spawn(worker, group) {
                Ok(()) => {
                    sink.emit(Event::WorkerSpawned {
                        worker,
                        group,
                        alarm: id,
                        at: now,
                    });
                    worker
                }
                Err(error) => {
                    world.unregister_worker(worker);
                    if let Some(alarm) = world.alarm_mut(id) {
                        alarm.spawn_attempts += 1;
                        let attempts = alarm.spawn_attempts;
                        warn!(alarm = id, attempts, %error, "could not spawn display worker");
                        if attempts >= MAX_SPAWN_ATTEMPTS {
                            // Give up: the reaper destroys it as unassigned.
                            alarm.state = AlarmState::Expired;
                            warn!(alarm = id, "alarm abandoned after repeated spawn failures");
                        }
                    }
                    return;
                }
            }
        }
    };

    world.assign(id, worker);
    sink.emit(Event::Assigned {
        alarm: id,
        worker,
        group,
        at: now,
    });
}

/// Thread body.
pub fn run<S: WorkerSpawner>(
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    mut spawner: S,
    shutdown: Arc<AtomicBool>,
) {
    super::run_periodic("dispatcher", &shutdown, || {
        let mut world = store.lock();
        sweep(&mut world, clock.now(), sink.as_ref(), &mut spawner);
    });
}
