//! Session state machine.
//!
//! A [`SessionController`] owns the lifecycle of at most one peripheral
//! connection:
//!
//! ```text
//!          start_discovery            connect
//!   Idle ─────────────────▶ Connecting ───────▶ Connected
//!    ▲  ◀──── failure ─────────┘                  │
//!    │                                            │ disconnect
//!    └──────────────── Disconnecting ◀────────────┘
//! ```
//!
//! Every operation takes `&mut self`, so transitions never interleave. Every
//! failure path ends in `Idle` with the subscription released and the
//! transport closed. That includes the peripheral closing its notification
//! stream while `Connected`: a monitor task closes the transport and emits
//! [`SessionEvent::Disconnected`] with [`DisconnectReason::BleError`], and
//! from then on the controller reports `Idle`.
//!
//! # Example
//!
//! ```no_run
//! use neuroglove_core::{ClientConfig, DiscoveryOutcome, SessionController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = SessionController::from_config(&ClientConfig::default())?;
//!
//! if let DiscoveryOutcome::Selected(device) = session.discover_and_connect().await? {
//!     println!("Streaming from {}", device.name);
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     for reading in session.readings() {
//!         println!("{:?}", reading.payload);
//!     }
//! }
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use neuroglove_types::{DeviceRecord, Reading};

use crate::api::{HttpBackend, SharedBackend};
use crate::ble::BleDiscovery;
use crate::buffer::SharedBuffer;
use crate::config::{ClientConfig, SessionConfig, SimulationMode};
use crate::error::{Error, Result};
use crate::events::{DisconnectReason, EventDispatcher, EventReceiver, SessionEvent};
use crate::history::HistoryClient;
use crate::ingest::Ingest;
use crate::peripheral::{Discovery, SharedPeripheral};
use crate::registry::DeviceRegistry;
use crate::subscription::{StreamSource, SubscriptionHandle, simulate, subscribe};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No peripheral selected.
    Idle,
    /// A peripheral is selected and registered; the transport is not streaming yet.
    Connecting,
    /// The transport is open and exactly one subscription is live.
    Connected,
    /// Teardown in progress.
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Result of a discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A peripheral was selected and registered.
    Selected(DeviceRecord),
    /// The user cancelled or nothing was in range. Informational only.
    NotFound,
}

/// The active peripheral of a controller.
struct Session {
    device: DeviceRecord,
    peripheral: SharedPeripheral,
    subscription: Option<SubscriptionHandle>,
    monitor: Option<JoinHandle<()>>,
}

impl Session {
    /// Whether the peripheral ended the live subscription.
    fn stream_lost(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|s| s.end_reason().is_some())
    }
}

/// Client-side state machine for one NeuroGlove connection.
pub struct SessionController {
    config: SessionConfig,
    discovery: Arc<dyn Discovery>,
    registry: DeviceRegistry,
    history: HistoryClient,
    backend: SharedBackend,
    events: EventDispatcher,
    state: SessionState,
    session: Option<Session>,
    buffer: SharedBuffer,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("device", &self.device().map(|d| &d.id))
            .field("source", &self.stream_source())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl SessionController {
    /// Create a controller from its collaborators.
    pub fn new(config: SessionConfig, discovery: Arc<dyn Discovery>, backend: SharedBackend) -> Self {
        let buffer = SharedBuffer::new(config.mode.buffer_capacity());
        Self {
            config,
            discovery,
            registry: DeviceRegistry::new(backend.clone()),
            history: HistoryClient::new(backend.clone()),
            backend,
            events: EventDispatcher::default(),
            state: SessionState::Idle,
            session: None,
            buffer,
        }
    }

    /// Create a controller using the platform Bluetooth stack and the HTTP
    /// backend.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let backend: SharedBackend = Arc::new(HttpBackend::new(&config.api)?);
        let discovery = Arc::new(BleDiscovery::new(&config.session));
        Ok(Self::new(config.session.clone(), discovery, backend))
    }

    // --- Observers ---

    /// Current lifecycle state.
    ///
    /// A session whose stream was ended by the peripheral is `Idle`.
    pub fn state(&self) -> SessionState {
        if self.stream_lost() {
            SessionState::Idle
        } else {
            self.state
        }
    }

    /// Record of the selected device, if any.
    pub fn device(&self) -> Option<&DeviceRecord> {
        self.active_session().map(|s| &s.device)
    }

    /// Readings of the current (or most recent) session, most recent first.
    pub fn readings(&self) -> Vec<Reading> {
        self.buffer.snapshot()
    }

    /// Source of the live subscription, if streaming.
    pub fn stream_source(&self) -> Option<StreamSource> {
        self.active_session()
            .and_then(|s| s.subscription.as_ref())
            .map(SubscriptionHandle::source)
    }

    /// Whether the subscription is still delivering values.
    pub fn is_streaming(&self) -> bool {
        self.active_session()
            .and_then(|s| s.subscription.as_ref())
            .is_some_and(SubscriptionHandle::is_active)
    }

    /// Receive lifecycle events and ingested readings.
    pub fn subscribe_events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Device registry sharing this controller's backend.
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// History client sharing this controller's backend.
    pub fn history(&self) -> &HistoryClient {
        &self.history
    }

    fn stream_lost(&self) -> bool {
        self.state == SessionState::Connected
            && self.session.as_ref().is_some_and(Session::stream_lost)
    }

    fn active_session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|s| !s.stream_lost())
    }

    /// Drop a session whose stream was ended by the peripheral.
    ///
    /// Waits for the monitor so its transport close cannot race a new
    /// connection.
    async fn reap_lost_stream(&mut self) {
        if !self.stream_lost() {
            return;
        }
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.subscription = None;
        if let Some(monitor) = session.monitor.take()
            && let Err(e) = monitor.await
        {
            debug!(error = %e, "Stream monitor ended abnormally");
        }
        self.state = SessionState::Idle;
        debug!(device_id = %session.device.id, "Released session after stream loss");
    }

    // --- Transitions ---

    /// Ask the platform for a peripheral and register it.
    ///
    /// On selection the machine moves to `Connecting`. A cancelled or empty
    /// discovery is reported as [`DiscoveryOutcome::NotFound`] and leaves the
    /// machine `Idle`, as does any error.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless `Idle`; otherwise whatever discovery or
    /// registration reported.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn start_discovery(&mut self) -> Result<DiscoveryOutcome> {
        self.reap_lost_stream().await;
        if self.state != SessionState::Idle {
            return Err(Error::invalid_state("start discovery", self.state));
        }

        self.events.send(SessionEvent::DiscoveryStarted);
        let Some(peripheral) = self.discovery.request_device().await? else {
            info!("No device selected");
            self.events.send(SessionEvent::DiscoveryCancelled);
            return Ok(DiscoveryOutcome::NotFound);
        };

        let device = self
            .registry
            .register_device(peripheral.id(), peripheral.name())
            .await?;

        self.buffer = SharedBuffer::new(self.config.mode.buffer_capacity());
        self.session = Some(Session {
            device: device.clone(),
            peripheral,
            subscription: None,
            monitor: None,
        });
        self.state = SessionState::Connecting;
        info!(device_id = %device.id, device_name = %device.name, "Device selected");
        self.events.send(SessionEvent::DeviceSelected {
            device: device.clone(),
        });

        Ok(DiscoveryOutcome::Selected(device))
    }

    /// Open the transport and arm the sensor stream.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless `Connecting`. Any failure to connect or
    /// to arm the stream closes the transport, returns the machine to `Idle`
    /// and is reported as [`Error::ConnectionFailed`].
    #[tracing::instrument(level = "info", skip_all, fields(mode = %self.config.mode))]
    pub async fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::Connecting {
            return Err(Error::invalid_state("connect", self.state));
        }
        let Some(session) = self.session.as_mut() else {
            self.state = SessionState::Idle;
            return Err(Error::invalid_state("connect", SessionState::Idle));
        };

        let device_id = session.device.id.clone();
        self.events.send(SessionEvent::Connecting {
            device_id: device_id.clone(),
        });

        let ingest = Ingest::new(
            &device_id,
            self.config.mode,
            self.buffer.clone(),
            self.backend.clone(),
            self.events.clone(),
        );

        match open_stream(&self.config, session.peripheral.clone(), ingest).await {
            Ok(subscription) => {
                let source = subscription.source();
                session.monitor = Some(spawn_stream_monitor(
                    subscription.end_signal(),
                    session.peripheral.clone(),
                    self.events.clone(),
                    device_id.clone(),
                ));
                session.subscription = Some(subscription);
                self.state = SessionState::Connected;
                info!(%device_id, %source, "Session connected");
                self.events.send(SessionEvent::Connected {
                    device: session.device.clone(),
                    source,
                });
                Ok(())
            }
            Err(e) => {
                let peripheral = session.peripheral.clone();
                self.session = None;
                self.state = SessionState::Idle;
                if let Err(close_err) = peripheral.disconnect().await {
                    debug!(error = %close_err, "Transport close after failed connect reported an error");
                }

                let err = e.into_connection_error(&device_id);
                warn!(%device_id, error = %err, "Connect failed");
                self.events.send(SessionEvent::ConnectionFailed {
                    device_id,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Tear down the subscription and transport and return to `Idle`.
    ///
    /// Teardown is unconditional: errors from closing an already-closed
    /// transport are logged and ignored. Calling this while `Idle` is a no-op.
    #[tracing::instrument(level = "info", skip_all, fields(state = %self.state))]
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Idle {
            debug!("Already idle, nothing to disconnect");
            return Ok(());
        }

        self.state = SessionState::Disconnecting;
        if let Some(mut session) = self.session.take() {
            let mut lost = false;
            if let Some(mut subscription) = session.subscription.take() {
                subscription.shutdown().await;
                lost = subscription.end_reason().is_some();
            }
            if let Some(monitor) = session.monitor.take()
                && let Err(e) = monitor.await
            {
                debug!(error = %e, "Stream monitor ended abnormally");
            }

            // A lost stream was already closed and reported by the monitor.
            if !lost {
                if let Err(e) = session.peripheral.disconnect().await {
                    debug!(error = %e, "Transport close reported an error (may already be closed)");
                }
                info!(device_id = %session.device.id, "Disconnected");
                self.events.send(SessionEvent::Disconnected {
                    device_id: session.device.id,
                    reason: DisconnectReason::UserRequested,
                });
            }
        }
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Run [`start_discovery`](Self::start_discovery) and, if a device was
    /// selected, [`connect`](Self::connect).
    pub async fn discover_and_connect(&mut self) -> Result<DiscoveryOutcome> {
        let outcome = self.start_discovery().await?;
        if matches!(outcome, DiscoveryOutcome::Selected(_)) {
            self.connect().await?;
        }
        Ok(outcome)
    }

    /// Fetch persisted readings of the selected device and append them behind
    /// the buffered ones.
    ///
    /// Only readings of the session's kind that are older than the oldest
    /// buffered reading are taken, and only into free slots. Live readings
    /// arriving meanwhile are not deduplicated against them. Returns the
    /// number of readings added.
    pub async fn load_history(&mut self) -> Result<usize> {
        self.reap_lost_stream().await;
        let Some(session) = self.session.as_ref() else {
            return Err(Error::invalid_state("load history", self.state));
        };

        let history = self.history.fetch_history(&session.device.id).await?;
        let mode = self.config.mode;

        let mut buffer = self.buffer.lock();
        let cutoff = buffer.iter().last().map(|r| r.timestamp);
        let added = buffer.extend_history(
            history
                .into_iter()
                .filter(|r| r.kind() == mode)
                .filter(|r| cutoff.is_none_or(|c| r.timestamp < c)),
        );
        debug!(added, "History loaded into buffer");
        Ok(added)
    }
}

/// Connect the transport and start the subscription the config asks for.
///
/// On failure after the transport opened, the caller closes it.
async fn open_stream(
    config: &SessionConfig,
    peripheral: SharedPeripheral,
    ingest: Ingest,
) -> Result<SubscriptionHandle> {
    timeout(config.connect_timeout, peripheral.connect())
        .await
        .map_err(|_| Error::timeout("connect to device", config.connect_timeout))??;

    match config.simulation {
        SimulationMode::Always => Ok(simulate(ingest, config.simulation_interval)),
        SimulationMode::Never => subscribe(peripheral, ingest).await,
        SimulationMode::Auto => match subscribe(peripheral, ingest.clone()).await {
            Err(Error::CharacteristicNotFound { uuid, .. }) => {
                info!(%uuid, "Sensor characteristic missing, simulating readings");
                Ok(simulate(ingest, config.simulation_interval))
            }
            other => other,
        },
    }
}

/// Watch a live subscription and tear the transport down if the peripheral
/// ends it.
///
/// Exits quietly when the subscription is stopped through its handle.
fn spawn_stream_monitor(
    mut ended: watch::Receiver<Option<String>>,
    peripheral: SharedPeripheral,
    events: EventDispatcher,
    device_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reason = match ended.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone().unwrap_or_default(),
            Err(_) => return,
        };

        warn!(%device_id, %reason, "Sensor stream lost, closing transport");
        if peripheral.is_connected().await
            && let Err(e) = peripheral.disconnect().await
        {
            debug!(error = %e, "Transport close after stream loss reported an error");
        }
        events.send(SessionEvent::Disconnected {
            device_id,
            reason: DisconnectReason::BleError(reason),
        });
    })
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if session.stream_lost() {
            return;
        }

        if let Some(mut subscription) = session.subscription.take() {
            subscription.unsubscribe();
        }

        warn!(
            device_id = %session.device.id,
            state = %self.state,
            "Session dropped without calling disconnect() - performing best-effort cleanup"
        );

        if let Ok(handle) = Handle::try_current() {
            let peripheral = session.peripheral.clone();
            handle.spawn(async move {
                if let Err(e) = peripheral.disconnect().await {
                    debug!(error = %e, "Best-effort disconnect failed (device may already be disconnected)");
                }
            });
        }

        self.events.send(SessionEvent::Disconnected {
            device_id: session.device.id,
            reason: DisconnectReason::Dropped,
        });
    }
}
