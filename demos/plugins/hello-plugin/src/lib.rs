//! Hello Plugin - A simple example plugin artifact for plughost
//!
//! This plugin demonstrates:
//! - Describing an artifact with an `ArtifactManifest` and `export_artifact!`
//! - Declaring dependencies and new event types from the initialization event
//! - Reading its own configuration from the configuration loading event
//! - Tagging a type with a custom marker
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.config/plughost/plugins ~/.config/plughost/config
//! cp target/release/libhello_plugin.so ~/.config/plughost/plugins/
//! printf 'pluginid = "hello"\ngreeting = "Hi there"\n' > ~/.config/plughost/config/hello.toml
//! plughost init --marker Command
//! ```

use plughost_api::{
    ArtifactManifest, Event, EventType, LoadedType, Plugin, PluginDescriptor, PluginError,
    export_artifact,
};

/// Plugin id used in dependency declarations and configuration files
pub const PLUGIN_ID: &str = "hello";

/// Entry type of the hello plugin
#[derive(Default)]
pub struct HelloPlugin;

impl Plugin for HelloPlugin {}

/// Type of the events this plugin announces
pub fn greeting_event() -> EventType {
    EventType::new("GreetingEvent", &EventType::event())
}

fn on_init(event: &mut Event) -> Result<(), PluginError> {
    let init = event
        .as_initialization_mut()
        .ok_or_else(|| PluginError::custom("expected an initialization event"))?;
    init.add_dependency("pluginmanager", Some("1.0.0"), None);
    init.add_event(greeting_event());
    Ok(())
}

fn on_configuration(event: &mut Event) -> Result<(), PluginError> {
    let Some(configurations) = event.as_configuration_loading() else {
        return Ok(());
    };

    let greeting = configurations
        .configuration(PLUGIN_ID)
        .and_then(|c| c.get::<String>("greeting"))
        .unwrap_or_else(|| "Hello".to_string());
    println!("[hello] configured greeting: {greeting}");
    Ok(())
}

fn on_greeting(event: &mut Event) -> Result<(), PluginError> {
    let name: String = event
        .custom_payload::<serde_json::Value>()?
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("world")
        .to_string();
    println!("[hello] Hello, {name}! (from {})", event.sender());
    Ok(())
}

fn manifest() -> ArtifactManifest {
    ArtifactManifest::new()
        .with_type(LoadedType::plugin::<HelloPlugin>(
            "HelloPlugin",
            PluginDescriptor::new(PLUGIN_ID, "Hello", "0.1.0").loadable_at_runtime(true),
        ))
        .with_type(
            LoadedType::subscriber("HelloListener")
                .with_handler("on_init", EventType::initialization(), on_init)
                .with_handler(
                    "on_configuration",
                    EventType::configuration_loading(),
                    on_configuration,
                )
                .with_handler("on_greeting", greeting_event(), on_greeting),
        )
        .with_type(LoadedType::new("GreetCommand").with_custom_marker("Command"))
}

export_artifact!(manifest);
