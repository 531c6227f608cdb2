//! Native runtime implementations.

#[cfg(feature = "native")]
pub mod ort;

#[cfg(feature = "pure")]
pub mod tract;

use crate::{Result, Tensor};

/// A loaded native model handle.
///
/// This is the only capability the neuropod core needs from a framework:
/// feed named tensors, run the model to completion, read named tensors
/// back. Positional runtimes receive the feed in the order the executor
/// built it and may ignore the names.
///
/// Concurrent `run` calls are as safe as the implementation makes them;
/// callers above this trait add no locking.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given inputs.
    ///
    /// # Arguments
    /// * `inputs` - Native-named input tensors
    ///
    /// # Returns
    /// Native-named output tensors from the model
    fn run(&self, inputs: &[(&str, Tensor)]) -> Result<Vec<(String, Tensor)>>;

    /// Get the input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Get the output names produced by the model.
    fn output_names(&self) -> &[String];
}
