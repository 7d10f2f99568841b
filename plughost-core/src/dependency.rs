//! Dependency resolver - checks `id@lower:upper` declarations against the registry

use std::fmt;
use std::str::FromStr;

use crate::error::{AggregateError, ManagerError};
use crate::plugins::registry::PluginRegistry;
use crate::version::Version;

/// Token for an unconstrained bound
pub const ANY: &str = "any";

/// A plugin id plus optional inclusive version bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRange {
    pub target: String,
    pub lower: Option<Version>,
    pub upper: Option<Version>,
}

impl DependencyRange {
    pub fn new(target: impl Into<String>, lower: Option<Version>, upper: Option<Version>) -> Self {
        Self {
            target: target.into(),
            lower,
            upper,
        }
    }

    /// Whether the registry holds `target` at a version inside the bounds
    pub fn is_satisfied_by(&self, registry: &PluginRegistry) -> bool {
        registry
            .find_by_id(&self.target)
            .is_some_and(|p| p.version().is_within(self.lower.as_ref(), self.upper.as_ref()))
    }
}

fn parse_bound(bound: &str) -> Result<Option<Version>, ManagerError> {
    if bound == ANY {
        return Ok(None);
    }
    Ok(Some(bound.parse()?))
}

impl FromStr for DependencyRange {
    type Err = ManagerError;

    fn from_str(declaration: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ManagerError::InvalidDependency {
            declaration: declaration.to_string(),
            reason: reason.to_string(),
        };

        let (target, bounds) = declaration
            .split_once('@')
            .ok_or_else(|| invalid("expected '<id>@<lower>:<upper>'"))?;
        if target.is_empty() {
            return Err(invalid("plugin id is empty"));
        }

        let (lower, upper) = bounds
            .split_once(':')
            .ok_or_else(|| invalid("expected '<lower>:<upper>' after '@'"))?;

        Ok(Self {
            target: target.to_string(),
            lower: parse_bound(lower)?,
            upper: parse_bound(upper)?,
        })
    }
}

impl fmt::Display for DependencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@", self.target)?;
        match &self.lower {
            Some(v) => write!(f, "{v}")?,
            None => f.write_str(ANY)?,
        }
        f.write_str(":")?;
        match &self.upper {
            Some(v) => write!(f, "{v}"),
            None => f.write_str(ANY),
        }
    }
}

/// Check every declaration against `registry`.
///
/// Unparsable and unsatisfied declarations are all collected before failing.
pub fn resolve<S: AsRef<str>>(
    declarations: &[S],
    registry: &PluginRegistry,
) -> Result<(), AggregateError> {
    let mut errors = AggregateError::new();

    for declaration in declarations {
        let declaration = declaration.as_ref();

        let range = match declaration.parse::<DependencyRange>() {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(declaration, error = %e, "Unparsable dependency declaration");
                errors.push(e);
                continue;
            }
        };

        if range.is_satisfied_by(registry) {
            tracing::debug!(declaration, "Dependency satisfied");
        } else {
            tracing::warn!(declaration, "Missing a dependency");
            errors.push(ManagerError::DependencyMissing {
                declaration: declaration.to_string(),
            });
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::registry::LoadedPlugin;
    use crate::plugins::scanner::scan;
    use plughost_api::{LoadedType, Plugin, PluginDescriptor};
    use std::path::Path;

    #[derive(Default)]
    struct Entry;

    impl Plugin for Entry {}

    fn registry(plugins: &[(&str, &str)]) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register(LoadedPlugin::manager()).unwrap();
        for (id, version) in plugins {
            let path = Path::new("x.plugin");
            let types = vec![LoadedType::plugin::<Entry>(
                "Entry",
                PluginDescriptor::new(*id, *id, *version),
            )];
            let scanned = scan(path, types, &[]).unwrap();
            registry
                .register(LoadedPlugin::from_scan(scanned, path, None).unwrap())
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_parse_and_display() {
        let range: DependencyRange = "first@1.0.0:any".parse().unwrap();
        assert_eq!(range.target, "first");
        assert_eq!(range.lower, Some(Version::new(1, 0, 0)));
        assert_eq!(range.upper, None);
        assert_eq!(range.to_string(), "first@1.0.0:any");

        let open: DependencyRange = "x@any:any".parse().unwrap();
        assert_eq!(open, DependencyRange::new("x", None, None));
    }

    #[test]
    fn test_parse_rejects_malformed_declarations() {
        assert!(matches!(
            "first".parse::<DependencyRange>(),
            Err(ManagerError::InvalidDependency { .. })
        ));
        assert!(matches!(
            "first@1.0.0".parse::<DependencyRange>(),
            Err(ManagerError::InvalidDependency { .. })
        ));
        assert!(matches!(
            "@any:any".parse::<DependencyRange>(),
            Err(ManagerError::InvalidDependency { .. })
        ));
        assert!(matches!(
            "first@1.0:any".parse::<DependencyRange>(),
            Err(ManagerError::VersionParse(_))
        ));
    }

    #[test]
    fn test_any_any_is_membership_only() {
        let registry = registry(&[("x", "0.0.1")]);
        assert!(resolve(&["x@any:any"], &registry).is_ok());
        assert!(resolve(&["y@any:any"], &registry).is_err());
    }

    #[test]
    fn test_inclusive_range() {
        for (version, expected) in [
            ("0.9.9", false),
            ("1.0.0", true),
            ("1.5.0", true),
            ("2.0.0", true),
            ("2.0.1", false),
        ] {
            let registry = registry(&[("x", version)]);
            assert_eq!(
                resolve(&["x@1.0.0:2.0.0"], &registry).is_ok(),
                expected,
                "version {version}"
            );
        }
    }

    #[test]
    fn test_single_bound() {
        let registry = registry(&[("x", "1.2.0")]);
        assert!(resolve(&["x@1.0.0:any"], &registry).is_ok());
        assert!(resolve(&["x@any:1.1.0"], &registry).is_err());
    }

    #[test]
    fn test_manager_is_a_valid_dependency() {
        let registry = registry(&[]);
        assert!(resolve(&["pluginmanager@1.0.0:any"], &registry).is_ok());
    }

    #[test]
    fn test_collects_every_failure_in_order() {
        let registry = registry(&[("first", "0.9.0")]);
        let declarations = vec![
            "first@1.0.0:any".to_string(),
            "broken".to_string(),
            "pluginmanager@any:any".to_string(),
            "missing@any:any".to_string(),
        ];

        let err = resolve(declarations.as_slice(), &registry).unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(matches!(
            &err.errors()[0],
            ManagerError::DependencyMissing { declaration } if declaration == "first@1.0.0:any"
        ));
        assert!(matches!(&err.errors()[1], ManagerError::InvalidDependency { .. }));
        assert!(matches!(
            &err.errors()[2],
            ManagerError::DependencyMissing { declaration } if declaration == "missing@any:any"
        ));
    }
}
