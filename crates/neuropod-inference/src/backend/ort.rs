//! ONNX Runtime (ort) backend for native platforms with XNNPACK.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{ArrayD, IxDyn};
use ort::ep::XNNPACK;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor as OrtTensor};
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::Tensor;
use crate::{InferenceBackend, Result};

/// Session settings for [`OrtBackend`].
#[derive(Debug, Clone, Copy)]
pub struct OrtOptions {
    /// Threads used within a single operator.
    pub intra_threads: usize,
    /// Graph optimization level, 0 (disabled) through 3 (all).
    pub optimization_level: u8,
}

impl Default for OrtOptions {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            optimization_level: 3,
        }
    }
}

impl OrtOptions {
    fn graph_optimization_level(&self) -> GraphOptimizationLevel {
        match self.optimization_level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        }
    }
}

/// Backend using ONNX Runtime for native inference.
///
/// `Session::run` needs exclusive access, so concurrent calls are
/// serialized on an internal lock.
pub struct OrtBackend {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OrtBackend {
    /// Load a model from a file path with default session settings.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_with_options(path, OrtOptions::default())
    }

    /// Load a model from a file path.
    pub fn from_file_with_options<P: AsRef<Path>>(path: P, options: OrtOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model from: {}", path.display());

        let bytes = std::fs::read(path)?;
        Self::from_bytes_with_options(&bytes, options)
    }

    /// Load a model from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(bytes, OrtOptions::default())
    }

    pub fn from_bytes_with_options(bytes: &[u8], options: OrtOptions) -> Result<Self> {
        debug!("Loading ONNX model from {} bytes", bytes.len());

        let session = Session::builder()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_execution_providers([XNNPACK::default().build()])
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_optimization_level(options.graph_optimization_level())
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_intra_threads(options.intra_threads)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(bytes)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        debug!("Model inputs: {:?}", input_names);
        debug!("Model outputs: {:?}", output_names);

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
        })
    }

    fn convert_input(tensor: &Tensor) -> Result<SessionInputValue<'static>> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&s| s as i64).collect();
        let value: std::result::Result<SessionInputValue<'static>, ort::Error> = match tensor {
            Tensor::Float32(arr) => OrtTensor::from_array((shape, arr.iter().copied().collect::<Vec<_>>()))
                .map(Into::into),
            Tensor::Float64(arr) => OrtTensor::from_array((shape, arr.iter().copied().collect::<Vec<_>>()))
                .map(Into::into),
            Tensor::Int32(arr) => OrtTensor::from_array((shape, arr.iter().copied().collect::<Vec<_>>()))
                .map(Into::into),
            Tensor::Int64(arr) => OrtTensor::from_array((shape, arr.iter().copied().collect::<Vec<_>>()))
                .map(Into::into),
            Tensor::Uint8(arr) => OrtTensor::from_array((shape, arr.iter().copied().collect::<Vec<_>>()))
                .map(Into::into),
        };
        value.map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    fn convert_output(name: &str, value: &DynValue) -> Result<Tensor> {
        if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
            return to_array(shape, data.to_vec()).map(Tensor::Float32);
        }
        if let Ok((shape, data)) = value.try_extract_tensor::<f64>() {
            return to_array(shape, data.to_vec()).map(Tensor::Float64);
        }
        if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
            return to_array(shape, data.to_vec()).map(Tensor::Int64);
        }
        if let Ok((shape, data)) = value.try_extract_tensor::<i32>() {
            return to_array(shape, data.to_vec()).map(Tensor::Int32);
        }
        if let Ok((shape, data)) = value.try_extract_tensor::<u8>() {
            return to_array(shape, data.to_vec()).map(Tensor::Uint8);
        }
        Err(InferenceError::OutputExtraction(format!(
            "unsupported output type for '{}'",
            name
        )))
    }
}

fn to_array<T>(shape: &[i64], data: Vec<T>) -> Result<ArrayD<T>> {
    let shape: Vec<usize> = shape.iter().map(|&s| s as usize).collect();
    ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|e| InferenceError::OutputExtraction(e.to_string()))
}

impl InferenceBackend for OrtBackend {
    fn run(&self, inputs: &[(&str, Tensor)]) -> Result<Vec<(String, Tensor)>> {
        let ort_inputs: Vec<(&str, SessionInputValue<'static>)> = inputs
            .iter()
            .map(|(name, tensor)| Ok((*name, Self::convert_input(tensor)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut session = self.session.lock().map_err(|e| {
            InferenceError::InferenceFailed(format!("Failed to lock session: {}", e))
        })?;

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            let tensor = Self::convert_output(name, &value)?;
            results.push((name.to_string(), tensor));
        }

        Ok(results)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
