//! Runtime loaders and the registry that selects one per backend.

use std::collections::HashMap;
use std::path::PathBuf;

use neuropod_inference::InferenceBackend;

use crate::backends::{ArtifactSet, Backend};
use crate::models::config::OnnxRuntimeOptions;

/// Everything a loader may use beyond the artifact paths.
///
/// Built fresh for every load and never shared between packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadContext {
    /// Directories to resolve custom-op modules from, package code first.
    pub search_paths: Vec<PathBuf>,
    /// Identifier unique to the loaded package; loaders that register
    /// custom modules by name should scope them under it.
    pub namespace: String,
    pub onnx: OnnxRuntimeOptions,
}

/// Loads a backend's artifacts into a native runtime handle.
pub trait RuntimeLoader: Send + Sync {
    fn load(
        &self,
        artifacts: &ArtifactSet,
        context: &LoadContext,
    ) -> neuropod_inference::Result<Box<dyn InferenceBackend>>;
}

/// Registry of runtime loaders keyed by backend.
#[derive(Default)]
pub struct Runtimes {
    loaders: HashMap<Backend, Box<dyn RuntimeLoader>>,
}

impl Runtimes {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in ONNX loader, when an ONNX runtime
    /// feature is enabled.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut runtimes = Self::new();
        #[cfg(any(feature = "native", feature = "pure"))]
        runtimes.register(Backend::Onnx, OnnxLoader);
        runtimes
    }

    /// Register `loader` for `backend`, replacing any previous loader.
    pub fn register(
        &mut self,
        backend: Backend,
        loader: impl RuntimeLoader + 'static,
    ) -> &mut Self {
        self.loaders.insert(backend, Box::new(loader));
        self
    }

    pub fn get(&self, backend: Backend) -> Option<&dyn RuntimeLoader> {
        self.loaders.get(&backend).map(|loader| loader.as_ref())
    }

    pub fn contains(&self, backend: Backend) -> bool {
        self.loaders.contains_key(&backend)
    }
}

/// Loads ONNX packages with ort, or with tract when only the `pure`
/// feature is enabled.
#[cfg(any(feature = "native", feature = "pure"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxLoader;

#[cfg(any(feature = "native", feature = "pure"))]
impl RuntimeLoader for OnnxLoader {
    fn load(
        &self,
        artifacts: &ArtifactSet,
        context: &LoadContext,
    ) -> neuropod_inference::Result<Box<dyn InferenceBackend>> {
        let ArtifactSet::Onnx { model } = artifacts else {
            return Err(neuropod_inference::InferenceError::ModelLoad(format!(
                "onnx loader cannot load {} artifacts",
                artifacts.backend()
            )));
        };

        load_onnx(model, context)
    }
}

#[cfg(feature = "native")]
fn load_onnx(
    model: &std::path::Path,
    context: &LoadContext,
) -> neuropod_inference::Result<Box<dyn InferenceBackend>> {
    let options = neuropod_inference::OrtOptions {
        intra_threads: context.onnx.intra_threads,
        optimization_level: context.onnx.optimization_level,
    };
    let backend = neuropod_inference::OrtBackend::from_file_with_options(model, options)?;
    Ok(Box::new(backend))
}

#[cfg(all(feature = "pure", not(feature = "native")))]
fn load_onnx(
    model: &std::path::Path,
    _context: &LoadContext,
) -> neuropod_inference::Result<Box<dyn InferenceBackend>> {
    let backend = neuropod_inference::TractBackend::from_file(model)?;
    Ok(Box::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let runtimes = Runtimes::new();
        for backend in Backend::ALL {
            assert!(runtimes.get(backend).is_none());
        }
    }

    #[cfg(any(feature = "native", feature = "pure"))]
    #[test]
    fn test_defaults_register_onnx_only() {
        let runtimes = Runtimes::with_defaults();
        assert!(runtimes.contains(Backend::Onnx));
        assert!(!runtimes.contains(Backend::Caffe));
        assert!(!runtimes.contains(Backend::Mxnet));
    }
}
