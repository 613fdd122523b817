//! Consumer: drains the request buffer into the store.
//!
//! The single consumer gives every request its canonical effect: a `Start`
//! is admitted (or rejected) immediately, everything else lands on its
//! pending queue for the specialist applier. The consumer never mutates a
//! target alarm itself, so each mutation kind stays funnelled through one
//! actor.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::buffer::RequestBuffer;
use crate::clock::Clock;
use crate::events::{Event, EventSink};
use crate::request::{Request, ToggleKind};
use crate::store::{Store, World};

/// Apply one request to the world.
pub fn apply(world: &mut World, request: Request, now: i64, sink: &dyn EventSink) {
    match request {
        Request::Start(req) => {
            let id = req.id;
            match world.insert_start(req, now) {
                Ok(alarm) => sink.emit(Event::Inserted {
                    id: alarm.id,
                    group: alarm.group,
                    interval_s: alarm.interval_s,
                    expires_at: alarm.expires_at,
                    message: alarm.message.clone(),
                    at: now,
                }),
                Err(error) => warn!(%error, "Start_Alarm({id}) dropped"),
            }
        }
        Request::Change(record) => {
            debug!(id = record.id, "change request queued");
            world.enqueue_change(record);
        }
        Request::Cancel { id, timestamp } => {
            debug!(id, "cancel request queued");
            world.enqueue_cancel(id, timestamp);
        }
        Request::Suspend { id, timestamp } => {
            debug!(id, "suspend request queued");
            world.enqueue_toggle(ToggleKind::Suspend, id, timestamp);
        }
        Request::Resume { id, timestamp } => {
            debug!(id, "reactivate request queued");
            world.enqueue_toggle(ToggleKind::Resume, id, timestamp);
        }
        Request::View { timestamp } => {
            debug!("view request queued");
            world.enqueue_view(timestamp);
        }
    }
}

/// Thread body: block on the buffer, apply under the store lock, repeat
/// until the buffer is closed.
pub fn run(
    buffer: Arc<RequestBuffer>,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
) {
    debug!(thread = "consumer", "started");
    while let Some(request) = buffer.pop() {
        let mut world = store.lock();
        apply(&mut world, request, clock.now(), sink.as_ref());
    }
    debug!(thread = "consumer", "stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::request::StartRequest;

    fn start(id: u32) -> Request {
        Request::Start(StartRequest {
            id,
            group: 7,
            duration_s: 5,
            interval_s: 1,
            message: "hello".into(),
            timestamp: 100,
        })
    }

    #[test]
    fn start_is_admitted_and_announced() {
        let mut world = World::default();
        let sink = MemorySink::new();
        apply(&mut world, start(1), 100, &sink);

        assert!(world.alarm(1).is_some());
        let events = sink.take();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Inserted { id: 1, group: 7, .. }));
    }

    #[test]
    fn duplicate_start_is_dropped_silently_on_stdout() {
        let mut world = World::default();
        let sink = MemorySink::new();
        apply(&mut world, start(1), 100, &sink);
        apply(&mut world, start(1), 101, &sink);

        // One Inserted event; the duplicate left no trace and no state.
        assert_eq!(sink.take().len(), 1);
        assert_eq!(world.alarm(1).unwrap().created_at, 100);
    }

    #[test]
    fn mutations_only_enqueue() {
        let mut world = World::default();
        let sink = MemorySink::new();
        apply(&mut world, start(1), 100, &sink);
        sink.take();

        apply(&mut world, Request::Cancel { id: 1, timestamp: 105 }, 105, &sink);
        apply(&mut world, Request::Suspend { id: 1, timestamp: 105 }, 105, &sink);
        apply(&mut world, Request::View { timestamp: 105 }, 105, &sink);

        // Nothing observable until the specialist appliers run.
        assert!(sink.take().is_empty());
        assert_eq!(world.take_cancels().len(), 1);
        assert_eq!(world.take_toggles().len(), 1);
        assert_eq!(world.take_views().len(), 1);
        assert_eq!(world.alarm(1).unwrap().state, crate::AlarmState::Active);
    }
}
