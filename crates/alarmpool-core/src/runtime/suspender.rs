//! Suspend/resume applier.
//!
//! Toggles arrive on one queue so a suspend and a resume issued back to back
//! apply in the order they were typed. Suspension freezes the remaining
//! lifetime; resumption re-anchors the deadline from it and forces an
//! immediate next print.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::warn;

use crate::clock::Clock;
use crate::events::{Event, EventSink};
use crate::request::ToggleKind;
use crate::store::{Store, World};

/// Apply every queued suspend/resume toggle.
pub fn pass(world: &mut World, now: i64, sink: &dyn EventSink) {
    for (kind, target) in world.take_toggles() {
        let found = world.find_target(target.id, target.timestamp);
        match (kind, found) {
            (ToggleKind::Suspend, Ok(alarm)) => {
                if let Some(remaining_s) = alarm.suspend(now) {
                    sink.emit(Event::Suspended {
                        alarm: alarm.id,
                        group: alarm.group,
                        remaining_s,
                        at: now,
                    });
                }
                // Already suspended: idempotent, nothing to say.
            }
            (ToggleKind::Resume, Ok(alarm)) => {
                if let Some(expires_at) = alarm.resume(now) {
                    sink.emit(Event::Reactivated {
                        alarm: alarm.id,
                        group: alarm.group,
                        expires_at,
                        at: now,
                    });
                }
            }
            (ToggleKind::Suspend, Err(error)) => {
                warn!(%error, "Invalid Suspend Alarm Request({})", target.id);
            }
            (ToggleKind::Resume, Err(error)) => {
                warn!(%error, "Invalid Reactivate Alarm Request({})", target.id);
            }
        }
    }
}

/// Thread body.
pub fn run(
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<AtomicBool>,
) {
    super::run_periodic("suspender", &shutdown, || {
        let mut world = store.lock();
        pass(&mut world, clock.now(), sink.as_ref());
    });
}
