//! Error types for the neuropod-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the neuropod library.
#[derive(Error, Debug)]
pub enum NeuropodError {
    /// Packaging failed.
    #[error("packaging error: {0}")]
    Packaging(#[from] PackagingError),

    /// Loading or running a package failed.
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// Output verification failed.
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Native runtime failure, passed through untouched.
    #[error("native runtime error: {0}")]
    Inference(#[from] neuropod_inference::InferenceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building a package.
///
/// Everything except `Io` failures during artifact writes is raised
/// before the target directory is created.
#[derive(Error, Debug)]
pub enum PackagingError {
    /// The node name mapping does not cover the input and output spec.
    #[error(
        "expected an item in `node_name_mapping` for every tensor in input_spec and output_spec; missing: {missing:?}"
    )]
    SpecMismatch { missing: Vec<String> },

    /// Both or neither of the mutually exclusive model sources were given.
    #[error("exactly one of `{in_memory}` and `{path}` must be provided for the {backend} packager")]
    ModelSource {
        backend: &'static str,
        in_memory: &'static str,
        path: &'static str,
    },

    /// The target package path is already occupied.
    #[error("package path already exists: {}", .0.display())]
    PackageExists(PathBuf),

    /// A tensor name appears twice within one spec.
    #[error("duplicate tensor name `{name}` in {spec}")]
    DuplicateSpecName { spec: &'static str, name: String },

    /// Backend options are inconsistent or reference missing files.
    #[error("invalid {backend} options: {reason}")]
    InvalidOptions {
        backend: &'static str,
        reason: String,
    },

    /// A code path entry cannot be packaged.
    #[error("invalid code path {}: {reason}", .path.display())]
    InvalidCodePath { path: PathBuf, reason: String },
}

/// Errors raised while loading or running a package.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// A config file is missing, unparsable, or lacks required keys.
    #[error("corrupt config {}: {reason}", .path.display())]
    ConfigCorrupt { path: PathBuf, reason: String },

    /// The package names a platform no backend handles.
    #[error("unknown backend `{0}`")]
    UnknownBackend(String),

    /// A spec name has no entry in the node name mapping.
    #[error("no entry in `node_name_mapping` for `{name}`")]
    MissingNodeMapping { name: String },

    /// A required model artifact is absent from `0/data`.
    #[error("missing model artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// No runtime loader is registered for the backend.
    #[error("no runtime registered for backend `{0}`")]
    NoRuntime(&'static str),

    /// The native runtime did not produce a declared output.
    #[error("runtime produced no value for output `{name}` (native `{native}`)")]
    MissingOutput { name: String, native: String },
}

/// Errors raised when comparing outputs against expectations.
#[derive(Error, Debug)]
pub enum EvalError {
    /// An expected output is absent.
    #[error("output `{0}` is missing")]
    Missing(String),

    /// An output differs from its expected value.
    #[error("{name} does not match expected value: {reason}")]
    Mismatch { name: String, reason: String },
}

/// Result type for the neuropod library.
pub type Result<T> = std::result::Result<T, NeuropodError>;
