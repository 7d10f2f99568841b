//! List plugin artifacts without loading them

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use plughost_core::plugins::{discover_files, native_artifact_extension};

use crate::config::Settings;

#[derive(Args)]
pub struct DiscoverArgs {
    /// Directory to search (default: configured plugin directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Artifact file extension (default: the platform's library extension)
    #[arg(long)]
    pub extension: Option<String>,
}

pub fn run(args: DiscoverArgs, mut settings: Settings) -> Result<()> {
    settings.override_with(args.dir, None, args.recursive);
    let extension = args
        .extension
        .unwrap_or_else(|| native_artifact_extension().to_string());

    let found = discover_files(&settings.plugin_dir, settings.recursive, &extension)?;

    if found.is_empty() {
        println!("No plugin artifacts found");
        println!();
        println!("Plugin directory: {}", settings.plugin_dir.display());
        println!("Extension:        .{}", extension);
        return Ok(());
    }

    for path in found {
        println!("{}", path.display());
    }
    Ok(())
}
