//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use neuroglove_core::SimulationMode;
use neuroglove_types::ReadingKind;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

#[derive(Parser)]
#[command(name = "neuroglove")]
#[command(author, version, about = "CLI for NeuroGlove flex-sensor gloves", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "NEUROGLOVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true, env = "NEUROGLOVE_URL")]
    pub url: Option<String>,

    /// Backend session credential
    #[arg(long, global = true, env = "NEUROGLOVE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List devices registered to the current account
    Devices {
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Register a device, or show its existing record
    Register {
        /// Device identifier (MAC address or platform UUID)
        id: String,

        /// Display name (defaults to "Unknown Device")
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show persisted readings of a device, newest first
    History {
        /// Device identifier
        device_id: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Maximum number of readings to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Connect to a glove and stream its readings
    Connect {
        /// Address or name fragment of the glove to connect to
        #[arg(short, long, env = "NEUROGLOVE_DEVICE")]
        device: Option<String>,

        /// Sensor stream to subscribe to (battery, flex)
        #[arg(short, long)]
        mode: Option<ReadingKind>,

        /// When to substitute synthetic readings (auto, always, never)
        #[arg(short, long)]
        simulate: Option<SimulationMode>,

        /// Stop after this many readings
        #[arg(short, long)]
        count: Option<usize>,

        /// Append persisted readings behind the live ones after connecting
        #[arg(long)]
        load_history: bool,

        /// Use an in-process mock glove and backend instead of real hardware
        #[arg(long)]
        demo: bool,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show configuration file path
    Path,

    /// Show current configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_connect_flags() {
        let cli = Cli::try_parse_from([
            "neuroglove",
            "connect",
            "--mode",
            "battery",
            "--simulate",
            "never",
            "--count",
            "5",
            "--demo",
        ])
        .unwrap();

        match cli.command {
            Commands::Connect {
                mode,
                simulate,
                count,
                demo,
                load_history,
                ..
            } => {
                assert_eq!(mode, Some(ReadingKind::Battery));
                assert_eq!(simulate, Some(SimulationMode::Never));
                assert_eq!(count, Some(5));
                assert!(demo);
                assert!(!load_history);
            }
            _ => panic!("expected connect"),
        }
    }

    #[test]
    fn test_parse_flex_mode_alias() {
        let cli = Cli::try_parse_from(["neuroglove", "connect", "--mode", "flex"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Connect {
                mode: Some(ReadingKind::FlexMulti),
                ..
            }
        ));
    }

    #[test]
    fn test_no_color_flag() {
        let cli = Cli::try_parse_from(["neuroglove", "--no-color", "devices"]).unwrap();
        assert!(cli.no_color);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["neuroglove", "connect", "--mode", "temperature"]).is_err());
    }

    #[test]
    fn test_history_requires_device_id() {
        assert!(Cli::try_parse_from(["neuroglove", "history"]).is_err());

        let cli =
            Cli::try_parse_from(["neuroglove", "history", "dev-1", "--limit", "10"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History { ref device_id, limit: Some(10), .. } if device_id == "dev-1"
        ));
    }
}
