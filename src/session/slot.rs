//! Single-slot latest-value handoff between the producer and the consumer.
//!
//! The producer never blocks: a new value overwrites one the consumer has
//! not taken yet, so memory stays bounded when the consumer stalls.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct SlotState<T> {
    value: Option<T>,
    closed: bool,
    delivered: u64,
    dropped: u64,
}

pub struct LatestSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                closed: false,
                delivered: 0,
                dropped: 0,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value, replacing any untaken one. Returns true if a value
    /// was overwritten. Values put after `close` are discarded.
    pub fn put(&self, value: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        let overwrote = state.value.replace(value).is_some();
        if overwrote {
            state.dropped += 1;
        }
        drop(state);
        self.ready.notify_one();
        overwrote
    }

    /// Block until a value is available and take it. Returns `None` once
    /// the slot is closed and empty.
    pub fn take(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(value) = state.value.take() {
                state.delivered += 1;
                return Some(value);
            }
            if state.closed {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Take a value if one is waiting, without blocking.
    pub fn try_take(&self) -> Option<T> {
        let mut state = self.lock();
        let value = state.value.take();
        if value.is_some() {
            state.delivered += 1;
        }
        value
    }

    /// Stop accepting values and wake any waiting consumer. A value already
    /// in the slot can still be taken.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Values handed to the consumer.
    pub fn delivered(&self) -> u64 {
        self.lock().delivered
    }

    /// Values overwritten before the consumer took them.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
