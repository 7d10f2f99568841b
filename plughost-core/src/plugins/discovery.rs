//! Artifact discovery - walks a directory tree for files with a given extension

use std::path::{Path, PathBuf};

use crate::error::ManagerError;

/// Find every file under `root` whose extension is `extension`.
///
/// Entries are visited in file-name order, depth-first. Symlinked directories
/// are not followed; symlinked files are.
pub fn discover_files(
    root: &Path,
    recursive: bool,
    extension: &str,
) -> Result<Vec<PathBuf>, ManagerError> {
    tracing::debug!(dir = %root.display(), recursive, extension, "Looking for files");

    if !root.is_dir() {
        return Err(ManagerError::InvalidPath {
            path: root.to_path_buf(),
        });
    }

    let mut found = Vec::new();
    walk(root, recursive, extension, &mut found)?;

    tracing::debug!(
        dir = %root.display(),
        count = found.len(),
        recursive,
        "Finished looking for files"
    );
    Ok(found)
}

fn walk(
    dir: &Path,
    recursive: bool,
    extension: &str,
    found: &mut Vec<PathBuf>,
) -> Result<(), ManagerError> {
    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if recursive {
                walk(&path, true, extension, found)?;
            }
            continue;
        }

        if path.extension().is_some_and(|ext| ext == extension) && path.is_file() {
            tracing::debug!(path = %path.display(), "Found matching file");
            found.push(path);
        }
    }

    Ok(())
}

/// Extension of native plugin artifacts on this platform (`so`, `dylib`, `dll`)
pub fn native_artifact_extension() -> &'static str {
    std::env::consts::DLL_EXTENSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.plugin");
        touch(&file);

        let result = discover_files(&file, true, "plugin");
        assert!(matches!(result, Err(ManagerError::InvalidPath { .. })));

        let missing = discover_files(&dir.path().join("missing"), false, "plugin");
        assert!(matches!(missing, Err(ManagerError::InvalidPath { .. })));
    }

    #[test]
    fn test_flat_discovery_ignores_subdirectories() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("b.plugin"));
        touch(&dir.path().join("a.plugin"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("nested/c.plugin"));

        let found = discover_files(dir.path(), false, "plugin").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.plugin", "b.plugin"]);
    }

    #[test]
    fn test_recursive_discovery_is_depth_first() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a/inner/x.plugin"));
        touch(&dir.path().join("a/y.plugin"));
        touch(&dir.path().join("b.plugin"));
        touch(&dir.path().join("c/z.plugin"));

        let found = discover_files(dir.path(), true, "plugin").unwrap();
        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a/inner/x.plugin"),
                PathBuf::from("a/y.plugin"),
                PathBuf::from("b.plugin"),
                PathBuf::from("c/z.plugin"),
            ]
        );
    }

    #[test]
    fn test_directory_named_like_artifact_is_not_a_match() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("looks.plugin")).unwrap();

        let found = discover_files(dir.path(), false, "plugin").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_native_extension_is_known() {
        assert!(["so", "dylib", "dll"].contains(&native_artifact_extension()));
    }
}
