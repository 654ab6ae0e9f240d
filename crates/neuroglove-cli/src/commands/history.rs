//! History command implementation.

use anyhow::Result;
use neuroglove_core::{ClientConfig, HistoryClient};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_history_json, format_history_text};
use crate::util::{backend_hint, write_output};

/// Arguments for the history command.
pub struct HistoryArgs<'a> {
    pub device_id: &'a str,
    pub limit: Option<usize>,
    pub format: OutputFormat,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_history(client: &ClientConfig, args: HistoryArgs<'_>) -> Result<()> {
    let HistoryArgs {
        device_id,
        limit,
        format,
        opts,
    } = args;

    let history = HistoryClient::new(super::http_backend(client)?);
    let mut readings = history.fetch_history(device_id).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to fetch history for {}: {}{}",
            device_id,
            e,
            backend_hint(&client.api.base_url)
        )
    })?;
    if let Some(limit) = limit {
        readings.truncate(limit);
    }

    let content = match format {
        OutputFormat::Json => format_history_json(&readings, opts)?,
        OutputFormat::Text => format_history_text(&readings, opts),
    };
    write_output(&content)
}
