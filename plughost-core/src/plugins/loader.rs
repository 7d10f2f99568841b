//! Artifact loaders
//!
//! A loader turns one artifact path into the list of types it exposes. Two
//! implementations are provided:
//!
//! - [`DylibLoader`]: opens a native dynamic library per artifact, so symbols of
//!   different artifacts never collide
//! - [`StaticLoader`]: an in-process registration table for statically linked
//!   builds and tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use plughost_api::{API_VERSION, API_VERSION_SYMBOL, ArtifactManifest, LoadedType, MANIFEST_SYMBOL};

use super::discovery::native_artifact_extension;
use crate::error::LoadError;

/// Result of loading one artifact
pub struct LoadedArtifact {
    pub path: PathBuf,
    pub types: Vec<LoadedType>,
    /// Keeps the code behind `types` mapped
    library: Option<Library>,
}

impl LoadedArtifact {
    /// An artifact whose code is linked into the host
    pub fn linked(path: impl Into<PathBuf>, types: Vec<LoadedType>) -> Self {
        Self {
            path: path.into(),
            types,
            library: None,
        }
    }

    pub(crate) fn into_parts(self) -> (PathBuf, Vec<LoadedType>, Option<Library>) {
        (self.path, self.types, self.library)
    }
}

impl std::fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifact")
            .field("path", &self.path)
            .field("types", &self.types.len())
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

/// Loads the contents of plugin artifacts
pub trait ArtifactLoader {
    /// File extension of the artifacts this loader understands
    fn extension(&self) -> &str;

    /// Load every type contained in the artifact at `path`
    fn load(&mut self, path: &Path) -> Result<LoadedArtifact, LoadError>;
}

fn check_api_version(path: &Path, found: u32) -> Result<(), LoadError> {
    if found != API_VERSION {
        return Err(LoadError::ApiVersionMismatch {
            path: path.to_path_buf(),
            expected: API_VERSION,
            found,
        });
    }
    Ok(())
}

/// Loads artifacts built with [`plughost_api::export_artifact!`]
#[derive(Debug, Default)]
pub struct DylibLoader;

impl DylibLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactLoader for DylibLoader {
    fn extension(&self) -> &str {
        native_artifact_extension()
    }

    fn load(&mut self, path: &Path) -> Result<LoadedArtifact, LoadError> {
        tracing::debug!(path = %path.display(), "Loading artifact library");

        let library_error = |source| LoadError::Library {
            path: path.to_path_buf(),
            source,
        };

        // SAFETY: Artifacts are queued explicitly by the host application and are
        // expected to follow the export_artifact! contract.
        let library = unsafe { Library::new(path) }.map_err(library_error)?;

        let manifest = {
            // SAFETY: We're calling a C function exported by the artifact.
            let api_version_fn: Symbol<extern "C" fn() -> u32> =
                unsafe { library.get(API_VERSION_SYMBOL) }.map_err(library_error)?;
            check_api_version(path, api_version_fn())?;

            // SAFETY: The manifest function hands over a Box it allocated; we take
            // ownership back exactly once.
            let manifest_fn: Symbol<extern "C" fn() -> *mut ArtifactManifest> =
                unsafe { library.get(MANIFEST_SYMBOL) }.map_err(library_error)?;
            let raw = manifest_fn();
            if raw.is_null() {
                return Err(LoadError::NullManifest {
                    path: path.to_path_buf(),
                });
            }
            unsafe { Box::from_raw(raw) }
        };

        tracing::debug!(
            path = %path.display(),
            types = manifest.types.len(),
            "Artifact library loaded"
        );

        Ok(LoadedArtifact {
            path: path.to_path_buf(),
            types: manifest.types,
            library: Some(library),
        })
    }
}

/// Builds the manifest of a statically linked artifact
pub type ManifestFn = fn() -> ArtifactManifest;

/// Registration table keyed by artifact file stem.
///
/// `load("plugins/chat.plugin")` looks up `chat`; the file itself is never read.
#[derive(Debug)]
pub struct StaticLoader {
    extension: String,
    table: HashMap<String, ManifestFn>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self {
            extension: "plugin".to_string(),
            table: HashMap::new(),
        }
    }

    /// Builder: match artifacts with a different extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Builder: register an artifact
    pub fn with_artifact(mut self, name: impl Into<String>, manifest: ManifestFn) -> Self {
        self.register(name, manifest);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, manifest: ManifestFn) {
        self.table.insert(name.into(), manifest);
    }
}

impl Default for StaticLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactLoader for StaticLoader {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn load(&mut self, path: &Path) -> Result<LoadedArtifact, LoadError> {
        let manifest_fn = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| self.table.get(stem))
            .ok_or_else(|| LoadError::NotRegistered {
                path: path.to_path_buf(),
            })?;

        let manifest = manifest_fn();
        check_api_version(path, manifest.api_version)?;

        Ok(LoadedArtifact::linked(path, manifest.types))
    }
}
