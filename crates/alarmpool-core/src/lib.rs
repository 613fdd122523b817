//! # Alarmpool Core Library
//!
//! This library provides the scheduling core for the alarmpool interactive
//! alarm scheduler. It implements a CLI-first philosophy: all behavior lives
//! here, and the `alarmpool-cli` binary is a thin prompt-and-print layer over
//! the same core library.
//!
//! ## Architecture
//!
//! - **Request Buffer**: A bounded FIFO hand-off between the interactive
//!   prompt and the consumer thread, blocking on full/empty
//! - **Store**: The single-mutex shared world holding the active alarm table,
//!   the pending request queues, and the display worker registry
//! - **Runtime**: One specialist thread per request kind plus dynamically
//!   spawned, group-bound display workers. Every periodic thread is a thin
//!   loop over a pass function that the caller (or a test) can drive directly
//! - **Events**: Every observable occurrence produces an [`Event`]; the CLI
//!   sink renders them to stdout, tests collect them in memory
//!
//! ## Key Components
//!
//! - [`Alarm`]: the periodic print job entity and its state machine
//! - [`RequestBuffer`]: the bounded producer/consumer hand-off
//! - [`Store`]: the mutex-guarded world shared by all threads
//! - [`Supervisor`]: spawns the runtime threads and owns shutdown

pub mod alarm;
pub mod buffer;
pub mod clock;
pub mod error;
pub mod events;
pub mod request;
pub mod runtime;
pub mod store;

pub use alarm::{Alarm, AlarmState, ChangeField, Owner, PendingFlags};
pub use buffer::RequestBuffer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result, StoreError};
pub use events::{Event, EventSink, MemorySink, ViewRow};
pub use request::{ChangeRecord, Request, StartRequest, ToggleKind};
pub use runtime::supervisor::Supervisor;
pub use store::{Store, WorkerSlots, World};

/// Maximum number of alarms a single display worker may carry.
pub const MAX_ALARMS_PER_WORKER: usize = 2;

/// Capacity of the bounded request buffer between the prompt and the consumer.
pub const BUFFER_CAPACITY: usize = 4;

/// Maximum stored message length in bytes.
pub const MESSAGE_MAX: usize = 128;

/// Spawn attempts for one alarm before the dispatcher gives up on it.
pub const MAX_SPAWN_ATTEMPTS: u32 = 5;

/// Wake period of every periodic runtime thread.
pub const PASS_PERIOD: std::time::Duration = std::time::Duration::from_secs(1);
