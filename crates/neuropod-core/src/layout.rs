//! On-disk package layout and the two config documents it carries.
//!
//! ```text
//! <neuropod_path>/
//!   config.json       neuropod config: name, platform, input/output spec
//!   0/
//!     data/           backend artifacts, fixed names per backend
//!     code/           optional source trees for custom ops
//!     config.json     backend config: node_name_mapping and/or inputs
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ExecutorError, PackagingError, Result};
use crate::models::spec::{NodeNameMapping, TensorSpec};

/// The only layout version currently written or read.
pub const PACKAGE_VERSION: &str = "0";

const CONFIG_FILE: &str = "config.json";

/// Paths inside a package rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    /// Describe a package at `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Fail if the package root is already occupied.
    pub fn ensure_vacant(&self) -> std::result::Result<(), PackagingError> {
        if self.root.exists() {
            return Err(PackagingError::PackageExists(self.root.clone()));
        }
        Ok(())
    }

    /// Create the package root and its `0/data` directory.
    ///
    /// Never reuses an existing root.
    pub fn create(&self) -> Result<()> {
        self.ensure_vacant()?;
        fs::create_dir_all(self.data_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self) -> PathBuf {
        self.root.join(PACKAGE_VERSION)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.version_dir().join("data")
    }

    pub fn code_dir(&self) -> PathBuf {
        self.version_dir().join("code")
    }

    /// Path of an artifact inside `0/data`.
    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir().join(name)
    }

    pub fn neuropod_config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn backend_config_path(&self) -> PathBuf {
        self.version_dir().join(CONFIG_FILE)
    }

    pub fn write_neuropod_config(&self, config: &NeuropodConfig) -> Result<()> {
        write_json(&self.neuropod_config_path(), config)
    }

    pub fn read_neuropod_config(&self) -> Result<NeuropodConfig> {
        read_json(&self.neuropod_config_path())
    }

    pub fn write_backend_config(&self, config: &BackendConfig) -> Result<()> {
        write_json(&self.backend_config_path(), config)
    }

    pub fn read_backend_config(&self) -> Result<BackendConfig> {
        read_json(&self.backend_config_path())
    }
}

/// Top-level package description shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuropodConfig {
    pub name: String,
    /// Backend tag, e.g. `"onnx"`.
    pub platform: String,
    pub input_spec: Vec<TensorSpec>,
    pub output_spec: Vec<TensorSpec>,
}

/// Backend-specific config stored at `0/config.json`.
///
/// Named backends require `node_name_mapping`; the positional backend
/// requires `inputs`, the native input names in input-spec order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name_mapping: Option<NodeNameMapping>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Read a config document, mapping every failure to `ConfigCorrupt`.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let corrupt = |reason: String| ExecutorError::ConfigCorrupt {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
    let value = serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
    Ok(value)
}
