//! Load and initialize plugins, then report the registry

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use plughost_core::{AggregateError, PluginManager, PluginRegistry, dependency};

use crate::config::Settings;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to load plugin artifacts from
    #[arg(long)]
    pub plugin_dir: Option<PathBuf>,

    /// Directory to load plugin configurations from
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Custom marker to collect while scanning (repeatable)
    #[arg(long = "marker")]
    pub markers: Vec<String>,

    /// Do not relay plugin configurations after initialization
    #[arg(long)]
    pub skip_configurations: bool,

    /// Dependency the loaded plugins must satisfy, as `id@lower:upper` (repeatable)
    #[arg(long = "require")]
    pub requirements: Vec<String>,
}

pub fn run(args: InitArgs, mut settings: Settings) -> Result<()> {
    settings.override_with(args.plugin_dir, args.config_dir, args.recursive);
    settings.custom_markers.extend(args.markers);
    let config = settings.manager_config();

    let mut manager = PluginManager::default();
    for marker in &settings.custom_markers {
        manager.add_custom_marker(marker.clone());
    }

    if config.plugin_dir.is_dir() {
        manager.add_plugins_from(&config.plugin_dir, config.recursive)?;
    } else {
        tracing::warn!(
            dir = %config.plugin_dir.display(),
            "Plugin directory does not exist, starting without plugins"
        );
    }

    let initialized = manager.initialize();
    print_registry(manager.registry(), &settings.custom_markers);

    if let Err(errors) = initialized {
        print_errors(&errors);
        bail!("Initialization failed with {} error(s)", errors.len());
    }

    if !args.skip_configurations
        && config.config_dir.is_dir()
        && let Err(errors) = manager.load_configurations(&config.config_dir, config.recursive, [])
    {
        print_errors(&errors);
        bail!("Loading configurations failed with {} error(s)", errors.len());
    }

    if !args.requirements.is_empty() {
        if let Err(errors) = dependency::resolve(args.requirements.as_slice(), manager.registry()) {
            print_errors(&errors);
            bail!("{} requirement(s) not satisfied", errors.len());
        }
        println!("All {} requirement(s) satisfied", args.requirements.len());
    }

    Ok(())
}

fn registry_table(registry: &PluginRegistry, markers: &[String]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Version").fg(Color::Cyan),
        Cell::new("Runtime").fg(Color::Cyan),
        Cell::new("Subscribers").fg(Color::Cyan),
    ];
    header.extend(markers.iter().map(|m| Cell::new(m).fg(Color::Cyan)));
    header.push(Cell::new("Source").fg(Color::Cyan));
    table.set_header(header);

    for plugin in registry {
        let mut row = vec![
            Cell::new(plugin.id()),
            Cell::new(plugin.name()),
            Cell::new(plugin.version()),
            Cell::new(if plugin.descriptor().loadable_at_runtime {
                "yes"
            } else {
                "no"
            }),
            Cell::new(plugin.subscribers().len()),
        ];
        row.extend(
            markers
                .iter()
                .map(|m| Cell::new(plugin.types_with_marker(m).len())),
        );
        row.push(Cell::new(
            plugin
                .source()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built in)".to_string()),
        ));
        table.add_row(row);
    }

    table
}

fn print_registry(registry: &PluginRegistry, markers: &[String]) {
    println!("{}", registry_table(registry, markers));
}

fn print_errors(errors: &AggregateError) {
    eprintln!("{} error(s):", errors.len());
    for (i, error) in errors.iter().enumerate() {
        eprintln!("  {}: {}", i + 1, error);
    }
}
