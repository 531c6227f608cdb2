//! The closed set of supported backends.
//!
//! Each backend module owns the only backend-specific steps: checking its
//! typed packaging options, writing artifacts under fixed names, and
//! locating those artifacts again at load time.

pub mod caffe;
pub mod caffe2;
pub mod mxnet;
pub mod onnx;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ExecutorError, PackagingError, Result};
use crate::layout::{BackendConfig, PackageLayout};
use crate::models::spec::{NodeNameMapping, TensorSpec};

pub use caffe::CaffeOptions;
pub use caffe2::Caffe2Options;
pub use mxnet::{MxnetOptions, SymbolExport};
pub use onnx::OnnxOptions;

/// A supported native framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Onnx,
    Caffe,
    Caffe2,
    Mxnet,
}

impl Backend {
    pub const ALL: [Backend; 4] = [Backend::Onnx, Backend::Caffe, Backend::Caffe2, Backend::Mxnet];

    /// Tag stored as `platform` in the neuropod config.
    pub fn tag(self) -> &'static str {
        match self {
            Backend::Onnx => "onnx",
            Backend::Caffe => "caffe",
            Backend::Caffe2 => "caffe2",
            Backend::Mxnet => "mxnet",
        }
    }

    /// Whether the native call site takes inputs by position rather than name.
    pub fn is_positional(self) -> bool {
        matches!(self, Backend::Mxnet)
    }

    /// Locate this backend's artifacts in an existing package.
    pub(crate) fn locate_artifacts(
        self,
        layout: &PackageLayout,
        backend_config: &BackendConfig,
    ) -> Result<ArtifactSet> {
        match self {
            Backend::Onnx => onnx::locate_artifacts(layout),
            Backend::Caffe => caffe::locate_artifacts(layout),
            Backend::Caffe2 => caffe2::locate_artifacts(layout),
            Backend::Mxnet => mxnet::locate_artifacts(layout, backend_config),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Backend {
    type Err = ExecutorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.tag() == s)
            .ok_or_else(|| ExecutorError::UnknownBackend(s.to_string()))
    }
}

/// Typed packaging options, one variant per backend.
pub enum BackendOptions {
    Onnx(OnnxOptions),
    Caffe(CaffeOptions),
    Caffe2(Caffe2Options),
    Mxnet(MxnetOptions),
}

impl BackendOptions {
    pub fn backend(&self) -> Backend {
        match self {
            BackendOptions::Onnx(_) => Backend::Onnx,
            BackendOptions::Caffe(_) => Backend::Caffe,
            BackendOptions::Caffe2(_) => Backend::Caffe2,
            BackendOptions::Mxnet(_) => Backend::Mxnet,
        }
    }

    /// Check the options without touching the filesystem beyond reads.
    pub(crate) fn validate(&self) -> std::result::Result<(), PackagingError> {
        match self {
            BackendOptions::Onnx(options) => options.validate(),
            BackendOptions::Caffe(options) => options.validate(),
            BackendOptions::Caffe2(options) => options.validate(),
            BackendOptions::Mxnet(options) => options.validate(),
        }
    }

    /// Write model artifacts into `0/data`.
    pub(crate) fn write_artifacts(&self, layout: &PackageLayout) -> Result<()> {
        match self {
            BackendOptions::Onnx(options) => options.write_artifacts(layout),
            BackendOptions::Caffe(options) => options.write_artifacts(layout),
            BackendOptions::Caffe2(options) => options.write_artifacts(layout),
            BackendOptions::Mxnet(options) => options.write_artifacts(layout),
        }
    }

    /// Build the `0/config.json` document.
    pub(crate) fn backend_config(
        &self,
        input_spec: &[TensorSpec],
        mapping: &NodeNameMapping,
    ) -> BackendConfig {
        let mut config = BackendConfig {
            node_name_mapping: Some(mapping.clone()),
            inputs: None,
        };
        if self.backend().is_positional() {
            config.inputs = Some(
                input_spec
                    .iter()
                    .filter_map(|t| mapping.get(&t.name).map(str::to_string))
                    .collect(),
            );
        }
        config
    }
}

impl From<OnnxOptions> for BackendOptions {
    fn from(options: OnnxOptions) -> Self {
        BackendOptions::Onnx(options)
    }
}

impl From<CaffeOptions> for BackendOptions {
    fn from(options: CaffeOptions) -> Self {
        BackendOptions::Caffe(options)
    }
}

impl From<Caffe2Options> for BackendOptions {
    fn from(options: Caffe2Options) -> Self {
        BackendOptions::Caffe2(options)
    }
}

impl From<MxnetOptions> for BackendOptions {
    fn from(options: MxnetOptions) -> Self {
        BackendOptions::Mxnet(options)
    }
}

/// Artifact paths handed to a runtime loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSet {
    Onnx {
        model: PathBuf,
    },
    Caffe {
        prototxt: PathBuf,
        /// Absent when the graph carries no separate weights.
        caffemodel: Option<PathBuf>,
    },
    Caffe2 {
        init_net: PathBuf,
        predict_net: PathBuf,
    },
    Mxnet {
        symbol: PathBuf,
        params: Option<PathBuf>,
        /// Native input names in call order.
        input_names: Vec<String>,
    },
}

impl ArtifactSet {
    pub fn backend(&self) -> Backend {
        match self {
            ArtifactSet::Onnx { .. } => Backend::Onnx,
            ArtifactSet::Caffe { .. } => Backend::Caffe,
            ArtifactSet::Caffe2 { .. } => Backend::Caffe2,
            ArtifactSet::Mxnet { .. } => Backend::Mxnet,
        }
    }
}

/// Return `path` if it is a file, else `MissingArtifact`.
pub(crate) fn required_artifact(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ExecutorError::MissingArtifact(path).into())
    }
}

pub(crate) fn optional_artifact(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Reject a named source file that does not exist.
pub(crate) fn require_file(
    backend: &'static str,
    what: &str,
    path: &std::path::Path,
) -> std::result::Result<(), PackagingError> {
    if path.is_file() {
        return Ok(());
    }
    Err(PackagingError::InvalidOptions {
        backend,
        reason: format!("{} not found: {}", what, path.display()),
    })
}

/// Enforce that exactly one of an in-memory model and a model path is set.
pub(crate) fn require_exactly_one(
    backend: &'static str,
    (in_memory, has_in_memory): (&'static str, bool),
    (path, has_path): (&'static str, bool),
) -> std::result::Result<(), PackagingError> {
    if has_in_memory == has_path {
        return Err(PackagingError::ModelSource {
            backend,
            in_memory,
            path,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::spec::{DType, Dim};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tag_roundtrip() {
        for backend in Backend::ALL {
            assert_eq!(backend.tag().parse::<Backend>().unwrap(), backend);
        }
        assert!(matches!(
            "tensorflow".parse::<Backend>(),
            Err(ExecutorError::UnknownBackend(ref tag)) if tag == "tensorflow"
        ));
    }

    #[test]
    fn test_require_exactly_one() {
        assert!(require_exactly_one("onnx", ("onnx_model", true), ("model_path", false)).is_ok());
        assert!(require_exactly_one("onnx", ("onnx_model", false), ("model_path", true)).is_ok());
        for both in [true, false] {
            let err = require_exactly_one("onnx", ("onnx_model", both), ("model_path", both))
                .unwrap_err();
            assert!(matches!(err, PackagingError::ModelSource { backend: "onnx", .. }));
        }
    }

    #[test]
    fn test_positional_config_lists_inputs_in_spec_order() {
        let input_spec = vec![
            TensorSpec::new("y", DType::Float32, vec![Dim::Any]),
            TensorSpec::new("x", DType::Float32, vec![Dim::Any]),
        ];
        let mapping: NodeNameMapping = [("x", "data0"), ("y", "data1"), ("out", "out0")]
            .into_iter()
            .collect();

        let options = BackendOptions::Mxnet(MxnetOptions::from_files("model-symbol.json", None));
        let config = options.backend_config(&input_spec, &mapping);
        assert_eq!(config.inputs, Some(vec!["data1".to_string(), "data0".to_string()]));

        let options = BackendOptions::Caffe2(Caffe2Options::new("predict.pb", "init.pb"));
        assert_eq!(options.backend_config(&input_spec, &mapping).inputs, None);
    }
}
