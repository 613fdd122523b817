//! Cancellation and expiry reaper.
//!
//! Cancellations mark the target; whoever owns the alarm destroys it — the
//! carrying worker on its next pass, or the reaper right away if nobody
//! carries it. The expiry sweep collects unassigned alarms that outlived
//! their deadline (including alarms the dispatcher gave up on), leaving
//! assigned ones for their worker to observe.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::warn;

use crate::alarm::AlarmState;
use crate::clock::Clock;
use crate::events::{Event, EventSink};
use crate::store::{Store, World};

/// Process queued cancellations, then sweep expired unassigned alarms.
pub fn pass(world: &mut World, now: i64, sink: &dyn EventSink) {
    for cancel in world.take_cancels() {
        match world.find_target(cancel.id, cancel.timestamp) {
            Ok(alarm) => {
                alarm.state = AlarmState::Cancelled;
                let (id, group, assigned) = (alarm.id, alarm.group, alarm.assigned_worker());
                if assigned.is_none() {
                    world.destroy(id);
                    sink.emit(Event::Cancelled {
                        alarm: id,
                        group,
                        at: now,
                    });
                }
            }
            Err(error) => warn!(%error, "Invalid Cancel Alarm Request({})", cancel.id),
        }
    }

    for alarm in world.remove_expired(now) {
        sink.emit(Event::Expired {
            alarm: alarm.id,
            group: alarm.group,
            at: now,
        });
    }
}

/// Thread body.
pub fn run(
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<AtomicBool>,
) {
    super::run_periodic("reaper", &shutdown, || {
        let mut world = store.lock();
        pass(&mut world, clock.now(), sink.as_ref());
    });
}
