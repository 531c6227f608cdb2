//! Copying caller source trees into `0/code`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern, glob_with};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PackagingError, Result};

/// Directories skipped while copying.
const SKIPPED_DIRS: &[&str] = &["__pycache__"];

/// File extensions skipped while copying.
const SKIPPED_EXTENSIONS: &[&str] = &["pyc", "pyo", "class"];

/// Source directories to ship with a package.
///
/// Each entry of `dirs_to_package` is relative to `root` and lands at the
/// same relative path under `0/code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePathSpec {
    pub root: PathBuf,
    pub dirs_to_package: Vec<PathBuf>,
}

impl CodePathSpec {
    pub fn new(root: impl Into<PathBuf>, dirs_to_package: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirs_to_package,
        }
    }
}

/// Check every code path entry before anything is written.
pub(crate) fn validate_code_paths(specs: &[CodePathSpec]) -> std::result::Result<(), PackagingError> {
    for spec in specs {
        for dir in non_empty(&spec.dirs_to_package) {
            let escapes = dir
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(PackagingError::InvalidCodePath {
                    path: dir.clone(),
                    reason: "must be relative to its root without `..`".to_string(),
                });
            }

            let source = spec.root.join(dir);
            if !source.is_dir() {
                return Err(PackagingError::InvalidCodePath {
                    path: source,
                    reason: "not a directory".to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Copy every code path entry into `code_dir`.
pub(crate) fn copy_code_paths(specs: &[CodePathSpec], code_dir: &Path) -> Result<()> {
    for spec in specs {
        for dir in non_empty(&spec.dirs_to_package) {
            let source = spec.root.join(dir);
            let target = code_dir.join(dir);
            debug!("Packaging code {} -> {}", source.display(), target.display());
            copy_tree(&source, &target)?;
        }
    }
    Ok(())
}

fn non_empty(dirs: &[PathBuf]) -> impl Iterator<Item = &PathBuf> {
    dirs.iter().filter(|d| !d.as_os_str().is_empty())
}

fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target)?;
    for path in entries(source)? {
        let Some(name) = path.file_name() else {
            continue;
        };

        let file_type = fs::symlink_metadata(&path)?.file_type();
        if file_type.is_dir() {
            if SKIPPED_DIRS.iter().any(|d| name == *d) {
                continue;
            }
            copy_tree(&path, &target.join(name))?;
        } else if file_type.is_symlink() && !path.is_file() {
            debug!("Skipping link {} that is not a regular file", path.display());
        } else if !is_generated(&path) {
            fs::copy(&path, target.join(name))?;
        }
    }
    Ok(())
}

/// Direct children of `dir`, dotfiles included.
fn entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        require_literal_leading_dot: false,
        ..MatchOptions::new()
    };
    let paths = glob_with(&pattern, options)
        .map_err(|e| PackagingError::InvalidCodePath {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(paths)
}

fn is_generated(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SKIPPED_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_copy_preserves_relative_paths_and_skips_generated() {
        let src = TempDir::new().unwrap();
        write(&src.path().join("ops/custom/__init__.py"), "");
        write(&src.path().join("ops/custom/kernel.py"), "def run(): pass");
        write(&src.path().join("ops/custom/kernel.pyc"), "bytecode");
        write(&src.path().join("ops/custom/__pycache__/kernel.cpython.pyc"), "bytecode");
        write(&src.path().join("unrelated/file.py"), "");

        let out = TempDir::new().unwrap();
        let specs = vec![CodePathSpec::new(
            src.path(),
            vec![PathBuf::from("ops/custom"), PathBuf::new()],
        )];
        validate_code_paths(&specs).unwrap();
        copy_code_paths(&specs, out.path()).unwrap();

        assert!(out.path().join("ops/custom/__init__.py").is_file());
        assert!(out.path().join("ops/custom/kernel.py").is_file());
        assert!(!out.path().join("ops/custom/kernel.pyc").exists());
        assert!(!out.path().join("ops/custom/__pycache__").exists());
        assert!(!out.path().join("unrelated").exists());
    }

    #[test]
    fn test_dotfiles_are_copied() {
        let src = TempDir::new().unwrap();
        write(&src.path().join("ops/.config"), "threads=1");

        let out = TempDir::new().unwrap();
        let specs = vec![CodePathSpec::new(src.path(), vec![PathBuf::from("ops")])];
        copy_code_paths(&specs, out.path()).unwrap();

        assert!(out.path().join("ops/.config").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_directories_are_not_followed() {
        let src = TempDir::new().unwrap();
        write(&src.path().join("ops/kernel.py"), "def run(): pass");
        write(&src.path().join("shared/util.py"), "");
        std::os::unix::fs::symlink(src.path().join("ops"), src.path().join("ops/loop")).unwrap();
        std::os::unix::fs::symlink(src.path().join("shared/util.py"), src.path().join("ops/util.py"))
            .unwrap();

        let out = TempDir::new().unwrap();
        let specs = vec![CodePathSpec::new(src.path(), vec![PathBuf::from("ops")])];
        copy_code_paths(&specs, out.path()).unwrap();

        assert!(out.path().join("ops/kernel.py").is_file());
        assert!(out.path().join("ops/util.py").is_file());
        assert!(!out.path().join("ops/loop").exists());
    }

    #[test]
    fn test_parent_dir_rejected() {
        let src = TempDir::new().unwrap();
        let specs = vec![CodePathSpec::new(src.path(), vec![PathBuf::from("../escape")])];
        assert!(matches!(
            validate_code_paths(&specs),
            Err(PackagingError::InvalidCodePath { .. })
        ));
    }

    #[test]
    fn test_missing_dir_rejected() {
        let src = TempDir::new().unwrap();
        let specs = vec![CodePathSpec::new(src.path(), vec![PathBuf::from("absent")])];
        assert!(matches!(
            validate_code_paths(&specs),
            Err(PackagingError::InvalidCodePath { .. })
        ));
    }
}
