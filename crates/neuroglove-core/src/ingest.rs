//! Sensor stream ingest.
//!
//! [`Ingest::ingest`] is the single entry point for raw characteristic
//! values, whether they come from a live notification or from the
//! simulator. Each call decodes one value into a [`Reading`], stores it at
//! the head of the session buffer, publishes it, and hands it to the backend
//! on a detached task. Persistence is at-most-once: a failed write is logged
//! and reported as an event, never retried, and never touches the buffer.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use neuroglove_types::{Reading, ReadingKind, ReadingPayload};

use crate::api::SharedBackend;
use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::events::{EventDispatcher, SessionEvent};

/// Turns raw values of one device and kind into buffered, persisted readings.
#[derive(Clone)]
pub struct Ingest {
    device_id: Arc<str>,
    kind: ReadingKind,
    buffer: SharedBuffer,
    backend: SharedBackend,
    events: EventDispatcher,
}

impl std::fmt::Debug for Ingest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingest")
            .field("device_id", &self.device_id)
            .field("kind", &self.kind)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl Ingest {
    pub fn new(
        device_id: &str,
        kind: ReadingKind,
        buffer: SharedBuffer,
        backend: SharedBackend,
        events: EventDispatcher,
    ) -> Self {
        Self {
            device_id: Arc::from(device_id),
            kind,
            buffer,
            backend,
            events,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn kind(&self) -> ReadingKind {
        self.kind
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// Ingest one raw characteristic value.
    ///
    /// The reading is in the buffer by the time this returns. Its timestamp
    /// is the current wall-clock time, clamped so it never precedes the
    /// reading before it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidData`] if the value does not decode; the
    /// buffer is left untouched. Persistence failures are never returned.
    pub fn ingest(&self, raw: &[u8]) -> Result<Reading> {
        let payload = ReadingPayload::decode(self.kind, raw)?;

        let reading = {
            let mut buffer = self.buffer.lock();
            let now = OffsetDateTime::now_utc();
            let timestamp = match buffer.latest() {
                Some(previous) if previous.timestamp > now => previous.timestamp,
                _ => now,
            };
            let reading = Reading::new(&*self.device_id, payload, timestamp);
            buffer.push(reading.clone());
            reading
        };

        debug!(device_id = %self.device_id, payload = ?reading.payload, "Reading ingested");
        self.events.send(SessionEvent::Reading {
            reading: reading.clone(),
        });
        self.persist(reading.clone());

        Ok(reading)
    }

    /// Fire-and-forget upload of one reading.
    fn persist(&self, reading: Reading) {
        let Ok(handle) = Handle::try_current() else {
            warn!(device_id = %reading.device_id, "No async runtime available, reading not persisted");
            return;
        };

        let backend = self.backend.clone();
        let events = self.events.clone();
        handle.spawn(async move {
            if let Err(e) = backend.save_reading(&reading).await {
                warn!(
                    device_id = %reading.device_id,
                    error = %e,
                    "Failed to persist reading"
                );
                events.send(SessionEvent::PersistFailed {
                    device_id: reading.device_id.clone(),
                    error: e.to_string(),
                });
            }
        });
    }
}
