//! Connect command implementation.
//!
//! Drives one glove session from discovery to disconnect, printing each
//! reading as it arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use neuroglove_core::subscription::synthetic_payload;
use neuroglove_core::{
    ClientConfig, DisconnectReason, DiscoveryOutcome, EventReceiver, MockBackend, MockDiscovery, MockPeripheral,
    SessionConfig, SessionController, SessionEvent,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_reading_json_line, format_reading_line};
use crate::util::{backend_hint, write_output};

/// Identifier of the in-process glove used by `--demo`.
const DEMO_DEVICE_ID: &str = "DEMO-NEUROGLOVE";

/// Arguments for the connect command.
pub struct ConnectArgs {
    pub count: Option<usize>,
    pub load_history: bool,
    pub demo: bool,
    pub format: OutputFormat,
    pub quiet: bool,
    pub opts: FormatOptions,
}

/// Build a session around a mock glove and an in-memory backend.
///
/// The returned task feeds the glove with random notifications.
fn demo_session(config: SessionConfig) -> (SessionController, JoinHandle<()>) {
    let glove = Arc::new(
        MockPeripheral::builder()
            .id(DEMO_DEVICE_ID)
            .name(Some("NeuroGlove Demo"))
            .build(),
    );
    let discovery = Arc::new(MockDiscovery::selecting(glove.clone()));
    let kind = config.mode;
    let interval = config.simulation_interval;

    let feeder = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if glove.has_subscriber(kind) {
                glove.notify(kind, &synthetic_payload(kind).to_bytes());
            }
        }
    });

    let session = SessionController::new(config, discovery, Arc::new(MockBackend::new()));
    (session, feeder)
}

pub async fn cmd_connect(client: ClientConfig, args: ConnectArgs) -> Result<()> {
    let ConnectArgs {
        count,
        load_history,
        demo,
        format,
        quiet,
        opts,
    } = args;

    let (mut session, feeder) = if demo {
        let (session, feeder) = demo_session(client.session.clone());
        (session, Some(feeder))
    } else {
        let session =
            SessionController::from_config(&client).context("Failed to set up session")?;
        (session, None)
    };

    let mut events = session.subscribe_events();
    let outcome = session.discover_and_connect().await;
    let result = match outcome {
        Ok(DiscoveryOutcome::Selected(device)) => {
            if !quiet {
                eprintln!(
                    "Connected to {} ({}) [{} stream, {}]",
                    device.name,
                    device.id,
                    session.config().mode,
                    session
                        .stream_source()
                        .map_or_else(|| "idle".to_string(), |s| s.to_string())
                );
            }
            if load_history {
                match session.load_history().await {
                    Ok(added) => debug!("Loaded {} historical readings", added),
                    Err(e) => warn!(
                        "Failed to load history: {}{}",
                        e,
                        backend_hint(&client.api.base_url)
                    ),
                }
            }
            stream(&mut events, count, format, quiet, &opts).await
        }
        Ok(DiscoveryOutcome::NotFound) => {
            if !quiet {
                eprintln!("No NeuroGlove selected.");
            }
            Ok(0)
        }
        Err(e) => Err(anyhow::Error::new(e).context("Failed to connect")),
    };

    if let Some(feeder) = feeder {
        feeder.abort();
    }
    session.disconnect().await.context("Failed to disconnect")?;

    let printed = result?;
    if !quiet && printed > 0 {
        eprintln!("Disconnected after {} readings.", printed);
    }
    Ok(())
}

/// Print readings until the count is reached, the session ends or the user
/// interrupts. Returns the number of readings printed.
async fn stream(
    events: &mut EventReceiver,
    count: Option<usize>,
    format: OutputFormat,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<usize> {
    let mut printed = 0usize;
    if count == Some(0) {
        return Ok(printed);
    }
    if !quiet {
        eprintln!("Press Ctrl+C to stop.");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                if !quiet {
                    eprintln!("\nStopping...");
                }
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Reading { reading }) => {
                    let line = match format {
                        OutputFormat::Json => format_reading_json_line(&reading)?,
                        OutputFormat::Text => format_reading_line(&reading, opts),
                    };
                    write_output(&line)?;
                    printed += 1;
                    if count.is_some_and(|n| printed >= n) {
                        break;
                    }
                }
                Ok(SessionEvent::PersistFailed { device_id, error }) => {
                    warn!(%device_id, "Failed to save reading: {}", error);
                }
                Ok(SessionEvent::Disconnected { device_id, reason }) => {
                    match reason {
                        DisconnectReason::BleError(error) => {
                            warn!(%device_id, "Sensor stream ended: {}", error);
                        }
                        other => debug!(%device_id, reason = ?other, "Session disconnected"),
                    }
                    break;
                }
                Ok(other) => debug!(?other, "Session event"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Output fell behind, skipped {} readings", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(printed)
}
