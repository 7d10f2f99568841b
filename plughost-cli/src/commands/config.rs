use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{ConfigLoader, Settings};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Show the settings file path
    Path,
}

pub fn run(args: ConfigArgs, settings: &Settings, explicit: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(settings),
        ConfigCommands::Path => show_path(explicit),
    }
}

fn show_config(settings: &Settings) -> Result<()> {
    let toml_str = toml::to_string_pretty(settings)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_path(explicit: Option<&Path>) -> Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigLoader::default_path);
    let status = if path.exists() { "" } else { " (not found)" };
    println!("Settings file: {}{}", path.display(), status);
    Ok(())
}
