//! ONNX packages: a single serialized `ModelProto` stored as `model.pb`.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::{ArtifactSet, require_exactly_one, require_file, required_artifact};
use crate::error::{PackagingError, Result};
use crate::layout::PackageLayout;

const BACKEND: &str = "onnx";
pub const MODEL_FILE: &str = "model.pb";

/// Packaging options for the ONNX backend.
///
/// Exactly one of `onnx_model` and `model_path` must be set.
#[derive(Debug, Clone, Default)]
pub struct OnnxOptions {
    /// Serialized in-memory `ModelProto`.
    pub onnx_model: Option<Vec<u8>>,
    /// Path to a serialized `ModelProto` on disk.
    pub model_path: Option<PathBuf>,
}

impl OnnxOptions {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            onnx_model: Some(bytes.into()),
            model_path: None,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            onnx_model: None,
            model_path: Some(path.into()),
        }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), PackagingError> {
        require_exactly_one(
            BACKEND,
            ("onnx_model", self.onnx_model.is_some()),
            ("model_path", self.model_path.is_some()),
        )?;
        if let Some(path) = &self.model_path {
            require_file(BACKEND, "model_path", path)?;
        }
        Ok(())
    }

    pub(crate) fn write_artifacts(&self, layout: &PackageLayout) -> Result<()> {
        let target = layout.data_file(MODEL_FILE);
        if let Some(bytes) = &self.onnx_model {
            debug!("Writing {} byte ONNX model to {}", bytes.len(), target.display());
            fs::write(&target, bytes)?;
        } else if let Some(path) = &self.model_path {
            debug!("Copying ONNX model {} to {}", path.display(), target.display());
            fs::copy(path, &target)?;
        } else {
            return Err(PackagingError::ModelSource {
                backend: BACKEND,
                in_memory: "onnx_model",
                path: "model_path",
            }
            .into());
        }
        Ok(())
    }
}

pub(crate) fn locate_artifacts(layout: &PackageLayout) -> Result<ArtifactSet> {
    Ok(ArtifactSet::Onnx {
        model: required_artifact(layout.data_file(MODEL_FILE))?,
    })
}
