//! Core error types for alarmpool-core.
//!
//! Every request is either applied or explicitly dropped with a diagnostic;
//! errors never cross a thread boundary. Store rejections ([`StoreError`])
//! are reported and swallowed by the thread that hit them; the only failure
//! that escapes to a caller is a core thread failing to spawn, surfaced from
//! [`Supervisor::start`].
//!
//! [`Supervisor::start`]: crate::Supervisor::start

use thiserror::Error;

/// Core error type for alarmpool-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A runtime thread could not be spawned
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Rejections produced while applying a request to the store.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// A `Start` re-used an id that is still active
    #[error("Alarm ID {0} is already in use")]
    DuplicateId(u32),

    /// A mutation named an id with no active alarm admitted before it
    #[error("no active alarm {id} admitted before {timestamp}")]
    UnknownTarget { id: u32, timestamp: i64 },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
