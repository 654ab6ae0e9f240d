//! Notification subscriptions and the simulator.
//!
//! Both [`subscribe`] and [`simulate`] spawn one task that feeds raw values
//! into [`Ingest::ingest`] strictly in arrival order, and return a
//! [`SubscriptionHandle`] that owns that task. Cancelling the handle (or
//! dropping it) stops delivery. A live subscription whose notification stream
//! is closed by the peripheral reports that through
//! [`SubscriptionHandle::end_signal`].

use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use neuroglove_types::{FlexValues, ReadingKind, ReadingPayload};

use crate::error::Result;
use crate::ingest::Ingest;
use crate::peripheral::SharedPeripheral;

/// Upper bound on disabling notifications during teardown.
const STOP_NOTIFICATIONS_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a subscription's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    /// Characteristic notifications from the peripheral.
    Live,
    /// Synthetic values generated on a fixed interval.
    Simulated,
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamSource::Live => write!(f, "live"),
            StreamSource::Simulated => write!(f, "simulated"),
        }
    }
}

/// Ownership of one running subscription.
///
/// Dropping the handle cancels the subscription.
pub struct SubscriptionHandle {
    kind: ReadingKind,
    source: StreamSource,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
    ended: watch::Receiver<Option<String>>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("active", &self.is_active())
            .finish()
    }
}

impl SubscriptionHandle {
    fn new(
        kind: ReadingKind,
        source: StreamSource,
        cancel_token: CancellationToken,
        task: JoinHandle<()>,
        ended: watch::Receiver<Option<String>>,
    ) -> Self {
        Self {
            kind,
            source,
            cancel_token,
            task: Some(task),
            ended,
        }
    }

    pub fn kind(&self) -> ReadingKind {
        self.kind
    }

    pub fn source(&self) -> StreamSource {
        self.source
    }

    /// Whether values are still being delivered.
    ///
    /// A live subscription also ends on its own when the peripheral closes
    /// the notification stream.
    pub fn is_active(&self) -> bool {
        !self.cancel_token.is_cancelled()
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Why the peripheral ended the subscription, if it did.
    ///
    /// Stays `None` for subscriptions stopped through this handle.
    pub fn end_reason(&self) -> Option<String> {
        self.ended.borrow().clone()
    }

    /// A receiver that observes [`end_reason`](Self::end_reason) changing.
    ///
    /// The sender is dropped without a value when the subscription is
    /// stopped through this handle.
    pub fn end_signal(&self) -> watch::Receiver<Option<String>> {
        self.ended.clone()
    }

    /// Stop delivery.
    ///
    /// Safe to call any number of times, including after the subscription
    /// ended on its own.
    pub fn unsubscribe(&mut self) {
        if self.cancel_token.is_cancelled() {
            return;
        }
        debug!(kind = %self.kind, source = %self.source, "Unsubscribing");
        self.cancel_token.cancel();
    }

    /// Stop delivery and wait until the delivery task has exited.
    ///
    /// Once this returns, no further readings are ingested through this
    /// subscription.
    pub async fn shutdown(&mut self) {
        self.unsubscribe();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Subscription task ended abnormally");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Subscribe to live notifications of `ingest.kind()` on a connected peripheral.
///
/// Battery subscriptions first read and ingest the current level; a failed
/// initial read is logged only. Values that fail to decode are logged and
/// dropped without ending the subscription.
///
/// # Errors
///
/// Fails if notifications cannot be enabled, e.g. with
/// [`crate::Error::CharacteristicNotFound`] when the peripheral lacks the
/// characteristic.
#[tracing::instrument(level = "info", skip_all, fields(device_id = %ingest.device_id(), kind = %ingest.kind()))]
pub async fn subscribe(peripheral: SharedPeripheral, ingest: Ingest) -> Result<SubscriptionHandle> {
    let kind = ingest.kind();
    let mut stream = peripheral.notifications(kind).await?;

    if kind == ReadingKind::Battery {
        match peripheral.read_value(kind).await {
            Ok(value) => {
                if let Err(e) = ingest.ingest(&value) {
                    warn!(error = %e, "Initial battery value dropped");
                }
            }
            Err(e) => warn!(error = %e, "Initial battery read failed"),
        }
    }

    let cancel_token = CancellationToken::new();
    let task_token = cancel_token.clone();
    let (ended_tx, ended_rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        let mut ended = None;
        loop {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("Subscription cancelled, stopping notifications");
                    break;
                }
                value = stream.next() => match value {
                    Some(value) => {
                        if let Err(e) = ingest.ingest(&value) {
                            warn!(
                                device_id = %ingest.device_id(),
                                error = %e,
                                len = value.len(),
                                "Dropping undecodable notification"
                            );
                        }
                    }
                    None => {
                        info!(device_id = %ingest.device_id(), "Notification stream ended");
                        ended = Some("notification stream closed by peripheral".to_string());
                        break;
                    }
                },
            }
        }

        drop(stream);
        match timeout(STOP_NOTIFICATIONS_TIMEOUT, peripheral.stop_notifications(kind)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Failed to disable notifications"),
            Err(_) => debug!("Timed out disabling notifications"),
        }
        if let Some(reason) = ended {
            ended_tx.send_replace(Some(reason));
        }
    });

    info!("Subscribed to live notifications");
    Ok(SubscriptionHandle::new(
        kind,
        StreamSource::Live,
        cancel_token,
        task,
        ended_rx,
    ))
}

/// Generate one synthetic value per `period`, starting one period from now.
///
/// Values go through the same [`Ingest::ingest`] entry point as live
/// notifications, so buffering and persistence behave identically.
pub fn simulate(ingest: Ingest, period: Duration) -> SubscriptionHandle {
    let kind = ingest.kind();
    let device_id = ingest.device_id().to_string();
    let cancel_token = CancellationToken::new();
    let task_token = cancel_token.clone();
    // The simulator never ends on its own; the sender just goes away with the task.
    let (ended_tx, ended_rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        let _ended_tx = ended_tx;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("Simulation cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let raw = synthetic_payload(kind).to_bytes();
                    if let Err(e) = ingest.ingest(&raw) {
                        warn!(error = %e, "Dropping synthetic value");
                    }
                }
            }
        }
    });

    info!(%device_id, %kind, ?period, "Simulating sensor stream");
    SubscriptionHandle::new(
        kind,
        StreamSource::Simulated,
        cancel_token,
        task,
        ended_rx,
    )
}

/// A random payload of the given kind.
pub fn synthetic_payload(kind: ReadingKind) -> ReadingPayload {
    let mut rng = rand::rng();
    match kind {
        ReadingKind::Battery => ReadingPayload::Battery {
            level: rng.random_range(0..=100),
        },
        ReadingKind::FlexMulti => {
            let mut values = [0u8; 5];
            for value in &mut values {
                *value = rng.random_range(0..100);
            }
            ReadingPayload::FlexMulti(FlexValues::from_array(values))
        }
    }
}
