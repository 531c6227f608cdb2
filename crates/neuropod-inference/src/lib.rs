//! Native runtime seam for neuropod executors.
//!
//! A native runtime is whatever actually executes a packaged model. This
//! crate only defines the shape of that collaborator and ships two ONNX
//! implementations:
//! - `ort` with the XNNPACK execution provider for native platforms
//! - `tract` as a pure Rust fallback

mod backend;
mod error;
mod tensor;

pub use backend::InferenceBackend;
pub use error::InferenceError;
pub use tensor::{Tensor, TensorType};

#[cfg(feature = "native")]
pub use backend::ort::{OrtBackend, OrtOptions};

#[cfg(feature = "pure")]
pub use backend::tract::TractBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
