use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "plughost", about = "Discover, load and initialize plugins")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// No log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Settings file (default: ~/.config/plughost/plughost.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// List plugin artifacts without loading them
    Discover(commands::discover::DiscoverArgs),
    /// Load and initialize plugins, then print the registry
    Init(commands::init::InitArgs),
}

fn log_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "off"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, cli.quiet)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = config::ConfigLoader::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config(args) => commands::config::run(args, &settings, cli.config.as_deref()),
        Commands::Discover(args) => commands::discover::run(args, settings),
        Commands::Init(args) => commands::init::run(args, settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(false, false), "info");
        assert_eq!(log_filter(true, false), "debug");
        assert_eq!(log_filter(false, true), "off");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["plughost", "-v", "-q", "discover"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["plughost", "init", "--config", "/tmp/p.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
