//! Command implementations for the CLI.

mod config;
mod connect;
mod devices;
mod history;
mod register;

use std::sync::Arc;

use anyhow::{Context, Result};
use neuroglove_core::{ClientConfig, HttpBackend, SharedBackend};

pub use config::cmd_config;
pub use connect::{ConnectArgs, cmd_connect};
pub use devices::cmd_devices;
pub use history::{HistoryArgs, cmd_history};
pub use register::cmd_register;

/// Build the HTTP backend described by the client configuration.
fn http_backend(client: &ClientConfig) -> Result<SharedBackend> {
    let backend = HttpBackend::new(&client.api)
        .with_context(|| format!("Failed to create backend client for {}", client.api.base_url))?;
    Ok(Arc::new(backend))
}
