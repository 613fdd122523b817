//! Supervisor: starts the runtime and owns shutdown.
//!
//! `start` brings up the consumer and the five specialist threads; display
//! workers come and go at the dispatcher's request. `shutdown` closes the
//! buffer (the consumer drains out), flips the shared flag, and joins
//! everything, workers included. Failure to spawn any of the core threads
//! aborts startup with an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tracing::debug;

use crate::buffer::RequestBuffer;
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::events::EventSink;
use crate::request::Request;
use crate::runtime::dispatcher::WorkerSpawner;
use crate::runtime::display::WorkerContext;
use crate::runtime::{changer, consumer, dispatcher, display, reaper, suspender, viewer};
use crate::store::Store;

type HandleList = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Spawns real display worker threads and keeps their join handles.
struct ThreadSpawner {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<AtomicBool>,
    handles: HandleList,
}

impl WorkerSpawner for ThreadSpawner {
    fn spawn(&mut self, worker: u32, group: u32) -> std::io::Result<()> {
        let ctx = WorkerContext { worker, group };
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let sink = Arc::clone(&self.sink);
        let shutdown = Arc::clone(&self.shutdown);
        let handle = std::thread::Builder::new()
            .name(format!("display-{worker}"))
            .spawn(move || display::run(ctx, store, clock, sink, shutdown))?;
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(())
    }
}

/// Owns the running pipeline.
pub struct Supervisor {
    store: Arc<Store>,
    buffer: Arc<RequestBuffer>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    worker_handles: HandleList,
}

impl Supervisor {
    /// Spawn the consumer and the specialist threads.
    pub fn start(clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Result<Self> {
        let store = Arc::new(Store::new());
        let buffer = Arc::new(RequestBuffer::with_default_capacity());
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_handles: HandleList = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        handles.push(spawn_named("consumer", {
            let (buffer, store, clock, sink) = (
                Arc::clone(&buffer),
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&sink),
            );
            move || consumer::run(buffer, store, clock, sink)
        })?);

        handles.push(spawn_named("dispatcher", {
            let spawner = ThreadSpawner {
                store: Arc::clone(&store),
                clock: Arc::clone(&clock),
                sink: Arc::clone(&sink),
                shutdown: Arc::clone(&shutdown),
                handles: Arc::clone(&worker_handles),
            };
            let (store, clock, sink, shutdown) = (
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&sink),
                Arc::clone(&shutdown),
            );
            move || dispatcher::run(store, clock, sink, spawner, shutdown)
        })?);

        for (name, run) in [
            ("changer", changer::run as RunFn),
            ("reaper", reaper::run as RunFn),
            ("suspender", suspender::run as RunFn),
            ("viewer", viewer::run as RunFn),
        ] {
            handles.push(spawn_named(name, {
                let (store, clock, sink, shutdown) = (
                    Arc::clone(&store),
                    Arc::clone(&clock),
                    Arc::clone(&sink),
                    Arc::clone(&shutdown),
                );
                move || run(store, clock, sink, shutdown)
            })?);
        }

        debug!("runtime started");
        Ok(Self {
            store,
            buffer,
            shutdown,
            handles,
            worker_handles,
        })
    }

    /// Hand a parsed request to the pipeline. Blocks while the buffer is
    /// full; returns `false` once the runtime is shutting down.
    pub fn submit(&self, request: Request) -> bool {
        self.buffer.push(request)
    }

    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// Close the buffer, stop every thread, and join them all.
    pub fn shutdown(mut self) {
        self.buffer.close();
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        let workers = std::mem::take(
            &mut *self
                .worker_handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in workers {
            let _ = handle.join();
        }
        debug!("runtime stopped");
    }
}

type RunFn = fn(Arc<Store>, Arc<dyn Clock>, Arc<dyn EventSink>, Arc<AtomicBool>);

fn spawn_named(
    name: &'static str,
    body: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|source| CoreError::Spawn {
            thread: name,
            source,
        })
}
