//! Capability scanner - classifies the types of one artifact by their markers

use std::collections::HashMap;
use std::path::Path;

use plughost_api::{LoadedType, Marker, PluginDescriptor};

use crate::error::ManagerError;

/// Classified contents of one artifact
#[derive(Debug)]
pub struct ScanResult {
    pub descriptor: PluginDescriptor,
    /// The type carrying the plugin descriptor
    pub entry: LoadedType,
    /// Types carrying the handler-subscriber marker, in artifact order
    pub subscribers: Vec<LoadedType>,
    /// One bucket per registered custom marker, possibly empty
    pub custom: HashMap<String, Vec<LoadedType>>,
}

/// Scan `types` for the plugin descriptor, handler subscribers and the
/// registered `custom_markers`.
///
/// Fails with [`ManagerError::MalformedPlugin`] unless exactly one plugin
/// descriptor is present, or when the descriptor type has no constructor.
pub fn scan(
    artifact: &Path,
    types: Vec<LoadedType>,
    custom_markers: &[String],
) -> Result<ScanResult, ManagerError> {
    let malformed = |reason: String| ManagerError::MalformedPlugin {
        artifact: artifact.to_path_buf(),
        reason,
    };

    let mut entry: Option<(PluginDescriptor, LoadedType)> = None;
    let mut descriptor_count = 0usize;
    let mut subscribers = Vec::new();
    let mut custom: HashMap<String, Vec<LoadedType>> = custom_markers
        .iter()
        .map(|marker| (marker.clone(), Vec::new()))
        .collect();

    for ty in types {
        tracing::debug!(
            artifact = %artifact.display(),
            r#type = %ty.name,
            markers = ty.markers.len(),
            "Inspecting type for markers"
        );

        for marker in &ty.markers {
            match marker {
                Marker::Plugin(descriptor) => {
                    descriptor_count += 1;
                    tracing::debug!(plugin = %descriptor.id, r#type = %ty.name, "Found plugin entry type");
                    if entry.is_none() {
                        entry = Some((descriptor.clone(), ty.clone()));
                    }
                }
                Marker::EventHandlerSubscriber => {
                    tracing::debug!(r#type = %ty.name, "Found event handler subscriber");
                    subscribers.push(ty.clone());
                }
                Marker::Custom(name) => {
                    if let Some(bucket) = custom.get_mut(name) {
                        tracing::debug!(r#type = %ty.name, marker = %name, "Found custom marker");
                        bucket.push(ty.clone());
                    }
                }
            }
        }
    }

    if descriptor_count > 1 {
        return Err(malformed(format!(
            "multiple plugins detected ({descriptor_count} plugin descriptors, expected exactly one)"
        )));
    }

    let Some((descriptor, entry)) = entry else {
        return Err(malformed("no plugin entry was found".to_string()));
    };

    if entry.factory.is_none() {
        return Err(malformed(format!(
            "plugin entry type {} has no no-argument constructor",
            entry.name
        )));
    }

    Ok(ScanResult {
        descriptor,
        entry,
        subscribers,
        custom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plughost_api::{Event, EventType, Plugin, PluginError};

    #[derive(Default)]
    struct Entry;

    impl Plugin for Entry {}

    fn handler(_event: &mut Event) -> Result<(), PluginError> {
        Ok(())
    }

    fn entry(id: &str) -> LoadedType {
        LoadedType::plugin::<Entry>("Entry", PluginDescriptor::new(id, id, "1.0.0"))
    }

    fn artifact() -> &'static Path {
        Path::new("chat.plugin")
    }

    #[test]
    fn test_scan_classifies_types() {
        let types = vec![
            LoadedType::subscriber("Listener").with_handler(
                "on_init",
                EventType::initialization(),
                handler,
            ),
            entry("chat"),
            LoadedType::new("Command").with_custom_marker("Command"),
            LoadedType::new("Plain"),
        ];

        let result = scan(
            artifact(),
            types,
            &["Command".to_string(), "Route".to_string()],
        )
        .unwrap();

        assert_eq!(result.descriptor.id, "chat");
        assert_eq!(result.entry.name, "Entry");
        assert_eq!(result.subscribers.len(), 1);
        assert_eq!(result.subscribers[0].name, "Listener");
        assert_eq!(result.custom["Command"].len(), 1);
        assert!(result.custom["Route"].is_empty());
    }

    #[test]
    fn test_scan_zero_descriptors() {
        let result = scan(artifact(), vec![LoadedType::subscriber("Listener")], &[]);
        match result {
            Err(ManagerError::MalformedPlugin { reason, .. }) => {
                assert!(reason.contains("no plugin entry"));
            }
            other => panic!("expected MalformedPlugin, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_multiple_descriptors_cites_multiplicity() {
        let result = scan(artifact(), vec![entry("a"), entry("b"), entry("c")], &[]);
        match result {
            Err(ManagerError::MalformedPlugin { reason, artifact }) => {
                assert!(reason.contains("multiple plugins"));
                assert!(reason.contains('3'));
                assert_eq!(artifact, Path::new("chat.plugin"));
            }
            other => panic!("expected MalformedPlugin, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_entry_without_constructor() {
        let bare = LoadedType::new("Entry")
            .with_marker(Marker::Plugin(PluginDescriptor::new("x", "X", "1.0.0")));
        let result = scan(artifact(), vec![bare], &[]);
        assert!(matches!(result, Err(ManagerError::MalformedPlugin { .. })));
    }

    #[test]
    fn test_unregistered_custom_marker_is_ignored() {
        let types = vec![entry("chat"), LoadedType::new("Route").with_custom_marker("Route")];
        let result = scan(artifact(), types, &[]).unwrap();
        assert!(result.custom.is_empty());
    }

    #[test]
    fn test_entry_may_also_be_subscriber() {
        let both = entry("chat").with_marker(Marker::EventHandlerSubscriber);
        let result = scan(artifact(), vec![both], &[]).unwrap();
        assert_eq!(result.subscribers.len(), 1);
        assert_eq!(result.subscribers[0].name, "Entry");
    }
}
