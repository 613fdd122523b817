//! The runtime threads.
//!
//! One specialist thread per request kind, plus the dynamically spawned
//! display workers. Each module exposes a *pass* function over the locked
//! world — that is where the behavior lives and what the unit tests drive —
//! and a `run` loop that the supervisor spawns: wake, take the store lock,
//! run one pass, release, sleep. No thread holds the lock across a sleep.

pub mod changer;
pub mod consumer;
pub mod dispatcher;
pub mod display;
pub mod reaper;
pub mod supervisor;
pub mod suspender;
pub mod viewer;

pub use dispatcher::{NoopSpawner, WorkerSpawner};
pub use display::{PassOutcome, WorkerContext};

use std::sync::atomic::{AtomicBool, Ordering};

use crate::PASS_PERIOD;

/// Drive `pass` once per period until the shutdown flag flips.
pub(crate) fn run_periodic(name: &'static str, shutdown: &AtomicBool, mut pass: impl FnMut()) {
    tracing::debug!(thread = name, "started");
    while !shutdown.load(Ordering::Relaxed) {
        pass();
        std::thread::sleep(PASS_PERIOD);
    }
    tracing::debug!(thread = name, "stopped");
}
