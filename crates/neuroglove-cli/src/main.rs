use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
mod util;

use cli::{Cli, Commands};
use commands::{
    ConnectArgs, HistoryArgs, cmd_config, cmd_connect, cmd_devices, cmd_history, cmd_register,
};
use config::{Config, Overrides};
use format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Readings go to stdout; keep logs off it so JSON output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path);
    let opts = FormatOptions::new(cli.no_color || config.no_color);
    let mut overrides = Overrides {
        url: cli.url.clone(),
        token: cli.token.clone(),
        ..Default::default()
    };

    match cli.command {
        Commands::Config { action } => cmd_config(action, &config_path, &config),
        Commands::Devices { format } => {
            let client = config.to_client_config(&overrides)?;
            cmd_devices(&client, config.resolve_format(format)?, &opts).await
        }
        Commands::Register { id, name } => {
            let client = config.to_client_config(&overrides)?;
            cmd_register(&client, &id, name.as_deref(), &opts).await
        }
        Commands::History {
            device_id,
            format,
            limit,
        } => {
            let client = config.to_client_config(&overrides)?;
            let args = HistoryArgs {
                device_id: &device_id,
                limit,
                format: config.resolve_format(format)?,
                opts: &opts,
            };
            cmd_history(&client, args).await
        }
        Commands::Connect {
            device,
            mode,
            simulate,
            count,
            load_history,
            demo,
            format,
        } => {
            overrides.device = device;
            overrides.mode = mode;
            overrides.simulation = simulate;
            let client = config.to_client_config(&overrides)?;
            let args = ConnectArgs {
                count,
                load_history,
                demo,
                format: config.resolve_format(format)?,
                quiet: cli.quiet,
                opts,
            };
            cmd_connect(client, args).await
        }
    }
}
