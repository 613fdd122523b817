//! Change applier: drains the pending change queue.
//!
//! Each record is matched against the active table under the staleness rule
//! and applied field by field; the pending flags it sets are what the
//! carrying display worker acknowledges on its next pass.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::events::{Event, EventSink};
use crate::store::{Store, World};

/// Apply every queued change record.
pub fn pass(world: &mut World, now: i64, sink: &dyn EventSink) {
    for record in world.take_changes() {
        match world.find_target(record.id, record.timestamp) {
            Ok(alarm) => {
                let applied = alarm.apply_change(&record, now);
                let (id, group) = (alarm.id, alarm.group);
                if applied.is_empty() {
                    debug!(alarm = id, "change request altered nothing");
                }
                for field in applied {
                    sink.emit(Event::Changed {
                        alarm: id,
                        group,
                        field,
                        at: now,
                    });
                }
            }
            Err(error) => warn!(%error, "Invalid Change Alarm Request({})", record.id),
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
    super::run_periodic("changer", &shutdown, || {
        let mut world = store.lock();
        pass(&mut world, clock.now(), sink.as_ref());
    });
}
