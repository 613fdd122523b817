//! Viewer: services snapshot-enumeration requests.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::clock::Clock;
use crate::events::{Event, EventSink};
use crate::store::{Store, World};

/// Emit one listing per queued view request.
pub fn pass(world: &mut World, now: i64, sink: &dyn EventSink) {
    for requested_at in world.take_views() {
        let rows = world.snapshot();
        sink.emit(Event::Viewed {
            rows,
            requested_at,
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
    super::run_periodic("viewer", &shutdown, || {
        let mut world = store.lock();
        pass(&mut world, clock.now(), sink.as_ref());
    });
}
