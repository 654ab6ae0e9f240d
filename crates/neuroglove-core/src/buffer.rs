//! Bounded in-memory window of recent readings.
//!
//! New readings enter at the head; once the buffer is full the oldest entry
//! at the tail is evicted. This FIFO eviction is the only eviction policy in
//! the client.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use neuroglove_types::Reading;

/// Fixed-capacity buffer of readings, most recent first.
#[derive(Debug, Clone)]
pub struct ReadingBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl ReadingBuffer {
    /// Create an empty buffer holding at most `capacity` readings.
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of readings retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Insert a reading at the head, evicting the tail when full.
    pub fn push(&mut self, reading: Reading) {
        if self.capacity == 0 {
            return;
        }
        if self.readings.len() == self.capacity {
            self.readings.pop_back();
        }
        self.readings.push_front(reading);
    }

    /// Append older readings behind the ones already held.
    ///
    /// Only the free slots are filled; newer entries are never evicted to
    /// make room. Returns how many readings were taken.
    pub fn extend_history<I>(&mut self, older: I) -> usize
    where
        I: IntoIterator<Item = Reading>,
    {
        let free = self.capacity.saturating_sub(self.readings.len());
        let before = self.readings.len();
        self.readings.extend(older.into_iter().take(free));
        self.readings.len() - before
    }

    /// Most recent reading, if any.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.front()
    }

    /// Iterate from most recent to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Copy of the contents, most recent first.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

/// A buffer shared between a session and its ingest task.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Arc<Mutex<ReadingBuffer>>,
}

impl SharedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ReadingBuffer::new(capacity))),
        }
    }

    /// Lock the buffer.
    ///
    /// A panic while the lock was held cannot leave the deque in a torn
    /// state, so a poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, ReadingBuffer> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, reading: Reading) {
        self.lock().push(reading);
    }

    pub fn snapshot(&self) -> Vec<Reading> {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Timestamp of the most recent reading.
    pub fn latest_timestamp(&self) -> Option<time::OffsetDateTime> {
        self.lock().latest().map(|r| r.timestamp)
    }
}
