//! Register command implementation.

use anyhow::Result;
use neuroglove_core::{ClientConfig, DeviceRegistry};

use crate::format::{FormatOptions, format_device_text};
use crate::util::{backend_hint, write_output};

pub async fn cmd_register(
    client: &ClientConfig,
    id: &str,
    name: Option<&str>,
    opts: &FormatOptions,
) -> Result<()> {
    let registry = DeviceRegistry::new(super::http_backend(client)?);
    let device = registry.register_device(id, name).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to register device {}: {}{}",
            id,
            e,
            backend_hint(&client.api.base_url)
        )
    })?;

    write_output(&format_device_text(&device, opts))
}
