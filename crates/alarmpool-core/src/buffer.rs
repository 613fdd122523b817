//! Bounded request buffer.
//!
//! Fixed-capacity ring between the interactive prompt (producer) and the
//! consumer thread. `push` blocks while full, `pop` blocks while empty;
//! `close` ends the hand-off at EOF. Correctness does not depend on there
//! being exactly one producer and one consumer.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::request::Request;
use crate::BUFFER_CAPACITY;

struct Ring {
    slots: VecDeque<Request>,
    /// Total accepted pushes, for slot-index traces.
    pushed: u64,
    /// Total completed pops, for slot-index traces.
    popped: u64,
    closed: bool,
}

/// Blocking bounded FIFO of pending requests.
pub struct RequestBuffer {
    capacity: usize,
    ring: Mutex<Ring>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl RequestBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be positive");
        Self {
            capacity,
            ring: Mutex::new(Ring {
                slots: VecDeque::with_capacity(capacity),
                pushed: 0,
                popped: 0,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(BUFFER_CAPACITY)
    }

    /// Insert a request, blocking while the buffer is full. Returns `false`
    /// if the buffer was closed (the request is discarded).
    pub fn push(&self, request: Request) -> bool {
        let mut ring = self.lock();
        while ring.slots.len() == self.capacity && !ring.closed {
            ring = self
                .not_full
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if ring.closed {
            return false;
        }
        let slot = (ring.pushed % self.capacity as u64) as usize;
        debug!(
            slot,
            kind = request.kind(),
            id = request.target_id(),
            "request inserted into buffer"
        );
        ring.slots.push_back(request);
        ring.pushed += 1;
        self.not_empty.notify_one();
        true
    }

    /// Remove the oldest request, blocking while the buffer is empty.
    /// Returns `None` once the buffer is closed; anything still in flight at
    /// that point is discarded.
    pub fn pop(&self) -> Option<Request> {
        let mut ring = self.lock();
        while ring.slots.is_empty() && !ring.closed {
            ring = self
                .not_empty
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if ring.closed {
            return None;
        }
        let request = ring.slots.pop_front()?;
        let slot = (ring.popped % self.capacity as u64) as usize;
        debug!(
            slot,
            kind = request.kind(),
            id = request.target_id(),
            "request retrieved from buffer"
        );
        ring.popped += 1;
        self.not_full.notify_one();
        Some(request)
    }

    /// Close the buffer, waking every blocked producer and consumer.
    pub fn close(&self) {
        let mut ring = self.lock();
        ring.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn cancel(id: u32) -> Request {
        Request::Cancel { id, timestamp: 0 }
    }

    #[test]
    fn fifo_order_preserved() {
        let buffer = RequestBuffer::new(4);
        for id in 1..=4 {
            assert!(buffer.push(cancel(id)));
        }
        for id in 1..=4 {
            assert_eq!(buffer.pop(), Some(cancel(id)));
        }
    }

    #[test]
    fn push_blocks_while_full() {
        let buffer = Arc::new(RequestBuffer::new(2));
        buffer.push(cancel(1));
        buffer.push(cancel(2));

        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || buffer.push(cancel(3)))
        };
        // The producer must still be parked on the full buffer.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(buffer.len(), 2);

        assert_eq!(buffer.pop(), Some(cancel(1)));
        assert!(producer.join().unwrap());
        assert_eq!(buffer.pop(), Some(cancel(2)));
        assert_eq!(buffer.pop(), Some(cancel(3)));
    }

    #[test]
    fn pop_blocks_until_push() {
        let buffer = Arc::new(RequestBuffer::new(2));
        let consumer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || buffer.pop())
        };
        std::thread::sleep(Duration::from_millis(50));
        buffer.push(cancel(9));
        assert_eq!(consumer.join().unwrap(), Some(cancel(9)));
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let buffer = Arc::new(RequestBuffer::new(2));
        let consumer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || buffer.pop())
        };
        std::thread::sleep(Duration::from_millis(50));
        buffer.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn close_discards_in_flight_requests() {
        let buffer = RequestBuffer::new(4);
        buffer.push(cancel(1));
        buffer.close();
        assert_eq!(buffer.pop(), None);
        assert!(!buffer.push(cancel(2)));
    }
}
