//! Error types for plughost-core

use std::fmt;
use std::path::PathBuf;

use plughost_api::{HandlerId, PluginError};
use thiserror::Error;

use crate::version::VersionParseError;

/// Errors from loading a single artifact
#[derive(Error, Debug)]
pub enum LoadError {
    /// Failed to open the dynamic library or resolve a symbol
    #[error("Failed to load plugin library {path}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// API version mismatch between plughost and the artifact
    #[error("API version mismatch in {path}: plughost expects {expected}, artifact has {found}")]
    ApiVersionMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    /// The artifact entry point returned no manifest
    #[error("Artifact {path} returned no manifest")]
    NullManifest { path: PathBuf },

    /// No registration table entry for this artifact
    #[error("No artifact registered for {path}")]
    NotRegistered { path: PathBuf },
}

/// A single failure inside a plugin manager operation
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Discovery root is not a directory
    #[error("The path {path} is not a directory")]
    InvalidPath { path: PathBuf },

    /// An artifact failed to load
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Zero or several plugin descriptors, missing constructor, or a
    /// runtime load of a plugin not marked loadable
    #[error("Malformed plugin {artifact}: {reason}")]
    MalformedPlugin { artifact: PathBuf, reason: String },

    /// A plugin with this id is already registered
    #[error("Plugin id '{id}' is already registered")]
    DuplicatePluginId { id: String },

    /// An unsatisfied dependency declaration
    #[error("Missing a dependency: {declaration}")]
    DependencyMissing { declaration: String },

    /// A dependency declaration that does not follow `id@lower:upper`
    #[error("Invalid dependency declaration '{declaration}': {reason}")]
    InvalidDependency { declaration: String, reason: String },

    /// A handler failed or panicked during dispatch
    #[error("Error invoking event handler {handler}: {source}")]
    HandlerInvocation {
        handler: HandlerId,
        #[source]
        source: PluginError,
    },

    #[error("Version error: {0}")]
    VersionParse(#[from] VersionParseError),

    /// Binding requested for an event type that was never declared
    #[error("Unknown event type: {name}")]
    UnknownEventType { name: String },

    /// A configuration could not be read or routed; `origin` names the
    /// file or the supplied configuration
    #[error("Configuration error in {origin}: {reason}")]
    Configuration { origin: String, reason: String },

    /// Operation not allowed in the manager's current state
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures collected over a batch operation.
///
/// Batch operations attempt every item and fail at the end iff at least one
/// failure was recorded. Entries keep their insertion order.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<ManagerError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure
    pub fn push(&mut self, error: impl Into<ManagerError>) {
        self.errors.push(error.into());
    }

    /// Move every failure of `other` into `self`
    pub fn append(&mut self, other: AggregateError) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Recorded failures, in order
    pub fn errors(&self) -> &[ManagerError] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManagerError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise the aggregate itself
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The following errors have occurred ({}):", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            write!(f, "\n  {}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<ManagerError> for AggregateError {
    fn from(error: ManagerError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl IntoIterator for AggregateError {
    type Item = ManagerError;
    type IntoIter = std::vec::IntoIter<ManagerError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a ManagerError;
    type IntoIter = std::slice::Iter<'a, ManagerError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl Extend<ManagerError> for AggregateError {
    fn extend<T: IntoIterator<Item = ManagerError>>(&mut self, iter: T) {
        self.errors.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let err = ManagerError::InvalidPath {
            path: PathBuf::from("/some/path"),
        };
        assert!(err.to_string().contains("/some/path"));
    }

    #[test]
    fn test_dependency_missing_display() {
        let err = ManagerError::DependencyMissing {
            declaration: "first@1.0.0:any".to_string(),
        };
        assert_eq!(err.to_string(), "Missing a dependency: first@1.0.0:any");
    }

    #[test]
    fn test_api_version_mismatch_display() {
        let err = LoadError::ApiVersionMismatch {
            path: PathBuf::from("libchat.so"),
            expected: 1,
            found: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("libchat.so"));
        assert!(msg.contains("expects 1"));
        assert!(msg.contains("has 2"));
    }

    #[test]
    fn test_handler_invocation_keeps_source() {
        use std::error::Error as _;

        let err = ManagerError::HandlerInvocation {
            handler: HandlerId::new("chat", "Listener", "on_init", "InitializationEvent"),
            source: PluginError::custom("boom"),
        };
        assert!(err.to_string().contains("chat::Listener::on_init"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ManagerError = io_err.into();
        assert!(matches!(err, ManagerError::Io(_)));
    }

    #[test]
    fn test_aggregate_empty_is_ok() {
        assert!(AggregateError::new().into_result().is_ok());
    }

    #[test]
    fn test_aggregate_keeps_order_and_fails() {
        let mut agg = AggregateError::new();
        agg.push(ManagerError::DuplicatePluginId { id: "a".into() });
        agg.push(LoadError::NotRegistered {
            path: PathBuf::from("b.plugin"),
        });
        agg.push(VersionParseError::WrongComponentCount { input: "1".into() });

        let err = agg.into_result().unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(matches!(err.errors()[0], ManagerError::DuplicatePluginId { .. }));
        assert!(matches!(err.errors()[1], ManagerError::Load(_)));
        assert!(matches!(err.errors()[2], ManagerError::VersionParse(_)));
    }

    #[test]
    fn test_aggregate_display_lists_every_entry() {
        let mut agg = AggregateError::new();
        agg.push(ManagerError::DependencyMissing {
            declaration: "x@any:any".into(),
        });
        agg.push(ManagerError::DependencyMissing {
            declaration: "y@any:any".into(),
        });

        let msg = agg.to_string();
        assert!(msg.starts_with("The following errors have occurred (2):"));
        assert!(msg.contains("1: Missing a dependency: x@any:any"));
        assert!(msg.contains("2: Missing a dependency: y@any:any"));
    }

    #[test]
    fn test_aggregate_append_and_iterate() {
        let mut first = AggregateError::from(ManagerError::UnknownEventType {
            name: "ChatEvent".into(),
        });
        let second = AggregateError::from(ManagerError::DuplicatePluginId { id: "a".into() });
        first.append(second);

        let kinds: Vec<bool> = first
            .iter()
            .map(|e| matches!(e, ManagerError::UnknownEventType { .. }))
            .collect();
        assert_eq!(kinds, vec![true, false]);
        assert_eq!(first.into_iter().count(), 2);
    }
}
