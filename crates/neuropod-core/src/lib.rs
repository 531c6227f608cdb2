//! Portable model packages.
//!
//! This crate provides:
//! - Tensor specs and node name mappings (`models::spec`)
//! - The on-disk package layout (`layout`)
//! - Packagers for ONNX, Caffe, Caffe2 and MXNet (`packager`, `backends`)
//! - An executor that loads any package through a registered runtime (`executor`)
//! - Name-mapping validation shared by every packager (`validation`)

pub mod backends;
pub mod error;
pub mod eval;
pub mod executor;
pub mod layout;
pub mod models;
pub mod packager;
pub mod validation;

pub use backends::{
    ArtifactSet, Backend, BackendOptions, Caffe2Options, CaffeOptions, MxnetOptions, OnnxOptions,
    SymbolExport,
};
pub use error::{EvalError, ExecutorError, NeuropodError, PackagingError, Result};
pub use executor::{LoadContext, NeuropodExecutor, RuntimeLoader, Runtimes, TensorMap};
pub use layout::{BackendConfig, NeuropodConfig, PackageLayout};
pub use models::config::{LoadOptions, OnnxRuntimeOptions};
pub use models::spec::{DType, Dim, NodeNameMapping, TensorSpec};
pub use packager::{CodePathSpec, PackageSpec, package};

#[cfg(any(feature = "native", feature = "pure"))]
pub use executor::OnnxLoader;

/// Re-export runtime types.
pub use neuropod_inference::{InferenceBackend, InferenceError, Tensor, TensorType};
