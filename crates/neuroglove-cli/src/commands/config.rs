//! Config command implementation.

use std::path::Path;

use anyhow::{Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::util::write_output;

pub fn cmd_config(action: ConfigAction, path: &Path, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Path => write_output(&format!("{}\n", path.display())),
        ConfigAction::Show => {
            if !path.exists() {
                eprintln!("No config file at {} (using defaults)", path.display());
            }
            let mut shown = config.clone();
            if shown.token.is_some() {
                shown.token = Some("<redacted>".to_string());
            }
            write_output(&toml::to_string_pretty(&shown)?)
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::with_defaults().save(path)?;
            eprintln!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}
