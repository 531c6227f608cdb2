//! Configuration for loading packages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options passed to [`NeuropodExecutor::load`](crate::NeuropodExecutor::load).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Expose the package's `0/code` directory to the runtime loader.
    pub load_custom_ops: bool,

    /// Caller-owned search paths handed to the runtime loader for this
    /// load only.
    pub extra_search_paths: Vec<PathBuf>,

    /// ONNX runtime settings.
    pub onnx: OnnxRuntimeOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            load_custom_ops: true,
            extra_search_paths: Vec::new(),
            onnx: OnnxRuntimeOptions::default(),
        }
    }
}

/// ONNX session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnnxRuntimeOptions {
    /// Number of intra-op threads.
    pub intra_threads: usize,

    /// Graph optimization level (0 - 3).
    pub optimization_level: u8,
}

impl Default for OnnxRuntimeOptions {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            optimization_level: 3,
        }
    }
}

impl LoadOptions {
    /// Load options from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save options to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: LoadOptions =
            serde_json::from_str(r#"{"onnx": {"intra_threads": 1}}"#).unwrap();
        assert!(options.load_custom_ops);
        assert_eq!(options.onnx.intra_threads, 1);
        assert_eq!(options.onnx.optimization_level, 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("load.json");
        let options = LoadOptions {
            load_custom_ops: false,
            extra_search_paths: vec![PathBuf::from("/opt/ops")],
            ..LoadOptions::default()
        };
        options.save(&path).unwrap();
        assert_eq!(LoadOptions::from_file(&path).unwrap(), options);
    }
}
