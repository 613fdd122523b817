//! Display worker: the periodic printer.
//!
//! A worker is bound to one group and carries up to
//! [`MAX_ALARMS_PER_WORKER`](crate::MAX_ALARMS_PER_WORKER) alarms. Once per
//! second it takes the store lock and walks its slots in insertion order:
//! cancelled and expired alarms are destroyed, suspended ones get a one-shot
//! notice, group moves are released back for reassignment, pending change
//! flags are acknowledged, and whatever is due gets printed. A worker whose
//! last slot empties retires itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::alarm::{AlarmState, ChangeField, Owner};
use crate::clock::Clock;
use crate::events::{Event, EventSink};
use crate::store::{Store, World};
use crate::PASS_PERIOD;

/// Identity of one display worker thread.
#[derive(Debug, Clone, Copy)]
pub struct WorkerContext {
    pub worker: u32,
    pub group: u32,
}

/// Whether the worker survives the pass it just ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Continue,
    Retire,
}

/// One worker pass over its slots.
pub fn pass(ctx: &WorkerContext, world: &mut World, now: i64, sink: &dyn EventSink) -> PassOutcome {
    let Some(slots) = world.worker(ctx.worker) else {
        return PassOutcome::Retire;
    };
    let ids = slots.alarms.clone();

    for id in ids {
        let Some(alarm) = world.alarm(id) else {
            // Destroyed behind our back; just give the slot up.
            world.clear_slot(ctx.worker, id);
            continue;
        };
        let state = alarm.state;
        let owner = alarm.owner;
        let expired = alarm.is_expired(now) || state == AlarmState::Expired;
        let group = alarm.group;

        if state == AlarmState::Cancelled {
            world.destroy(id);
            sink.emit(Event::Cancelled {
                alarm: id,
                group,
                at: now,
            });
            continue;
        }

        if state == AlarmState::Suspended {
            if let Some(alarm) = world.alarm_mut(id) {
                if !alarm.suspend_notice_sent {
                    alarm.suspend_notice_sent = true;
                    sink.emit(Event::SuspensionObserved {
                        alarm: id,
                        worker: ctx.worker,
                        at: now,
                    });
                }
            }
            continue;
        }

        if expired {
            if owner == Owner::Worker(ctx.worker) {
                world.destroy(id);
                sink.emit(Event::Expired {
                    alarm: id,
                    group,
                    at: now,
                });
            } else {
                world.clear_slot(ctx.worker, id);
            }
            continue;
        }

        let Some(alarm) = world.alarm_mut(id) else {
            continue;
        };

        if alarm.flags.group_changed {
            alarm.flags.group_changed = false;
            let new_group = alarm.group;
            world.release_to_store(id, ctx.worker);
            sink.emit(Event::GroupMoveStopped {
                alarm: id,
                worker: ctx.worker,
                new_group,
                at: now,
            });
            continue;
        }

        // Change acknowledgements stand in for this pass's print.
        let mut acknowledged = false;
        if alarm.flags.message_changed {
            alarm.flags.message_changed = false;
            let field = ChangeField::Message(alarm.message.clone());
            sink.emit(Event::ChangeObserved {
                alarm: id,
                worker: ctx.worker,
                field,
                at: now,
            });
            acknowledged = true;
        }
        if alarm.flags.interval_changed {
            alarm.flags.interval_changed = false;
            let field = ChangeField::Interval(alarm.interval_s);
            sink.emit(Event::ChangeObserved {
                alarm: id,
                worker: ctx.worker,
                field,
                at: now,
            });
            acknowledged = true;
        }
        if acknowledged {
            alarm.last_printed_at = now;
            continue;
        }

        if alarm.due(now) {
            alarm.last_printed_at = now;
            sink.emit(Event::Printed {
                alarm: id,
                worker: ctx.worker,
                group: alarm.group,
                message: alarm.message.clone(),
                at: now,
            });
        }
    }

    let remaining = world
        .worker(ctx.worker)
        .map(|slots| slots.alarms.len())
        .unwrap_or(0);
    if remaining == 0 {
        world.retire_worker(ctx.worker);
        sink.emit(Event::WorkerRetired {
            worker: ctx.worker,
            group: ctx.group,
            at: now,
        });
        return PassOutcome::Retire;
    }
    PassOutcome::Continue
}

/// Thread body: pass once per period until retired or shut down.
pub fn run(
    ctx: WorkerContext,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<AtomicBool>,
) {
    debug!(worker = ctx.worker, group = ctx.group, "display worker started");
    while !shutdown.load(Ordering::Relaxed) {
        {
            let mut world = store.lock();
            if pass(&ctx, &mut world, clock.now(), sink.as_ref()) == PassOutcome::Retire {
                debug!(worker = ctx.worker, "display worker retired");
                return;
            }
        }
        std::thread::sleep(PASS_PERIOD);
    }
    debug!(worker = ctx.worker, "display worker stopped");
}
