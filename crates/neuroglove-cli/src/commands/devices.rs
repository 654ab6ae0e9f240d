//! Devices command implementation.

use anyhow::Result;
use neuroglove_core::{ClientConfig, DeviceRegistry};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_devices_json, format_devices_text};
use crate::util::{backend_hint, write_output};

/// List registered devices.
///
/// A failed fetch is logged by the registry and shown as an empty list.
pub async fn cmd_devices(
    client: &ClientConfig,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<()> {
    let registry = DeviceRegistry::new(super::http_backend(client)?);
    let devices = registry.list_devices_or_empty().await;
    if devices.is_empty() {
        debug!("No devices returned{}", backend_hint(&client.api.base_url));
    }

    let content = match format {
        OutputFormat::Json => format_devices_json(&devices, opts)?,
        OutputFormat::Text => format_devices_text(&devices, opts),
    };
    write_output(&content)
}
