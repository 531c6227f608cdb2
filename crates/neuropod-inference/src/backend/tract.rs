//! Tract backend for pure Rust ONNX inference.

use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::Tensor;
use crate::{InferenceBackend, Result};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Backend using Tract for pure Rust ONNX inference.
///
/// Tract runs positionally, so named feeds are reordered to the model's
/// declared input order before each call.
pub struct TractBackend {
    model: Plan,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load a model from a file path using the shapes declared in the graph.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model with Tract from: {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::from_inference_model(model)
    }

    /// Load a model from bytes using the shapes declared in the graph.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        debug!("Loading ONNX model with Tract from {} bytes", bytes.len());

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::from_inference_model(model)
    }

    fn from_inference_model(model: InferenceModel) -> Result<Self> {
        let typed = model
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to optimize: {}", e)))?;

        let input_names: Vec<String> = typed
            .input_outlets()
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .iter()
            .map(|outlet| typed.node(outlet.node).name.clone())
            .collect();

        let output_names: Vec<String> = typed
            .output_outlets()
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .iter()
            .map(|outlet| {
                typed
                    .outlet_label(*outlet)
                    .map(str::to_string)
                    .unwrap_or_else(|| typed.node(outlet.node).name.clone())
            })
            .collect();

        debug!("Model inputs: {:?}", input_names);
        debug!("Model outputs: {:?}", output_names);

        let model = typed
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        Ok(Self {
            model,
            input_names,
            output_names,
        })
    }

    fn convert_input(tensor: &Tensor) -> Result<TValue> {
        let shape = tensor.shape().to_vec();
        match tensor {
            Tensor::Float32(arr) => to_tract(&shape, arr.iter().copied().collect()),
            Tensor::Float64(arr) => to_tract(&shape, arr.iter().copied().collect()),
            Tensor::Int32(arr) => to_tract(&shape, arr.iter().copied().collect()),
            Tensor::Int64(arr) => to_tract(&shape, arr.iter().copied().collect()),
            Tensor::Uint8(arr) => to_tract(&shape, arr.iter().copied().collect()),
        }
    }

    fn convert_output(name: &str, output: &TValue) -> Result<Tensor> {
        if let Ok(arr) = output.to_array_view::<f32>() {
            return from_tract(arr.shape(), arr.iter().copied().collect()).map(Tensor::Float32);
        }
        if let Ok(arr) = output.to_array_view::<f64>() {
            return from_tract(arr.shape(), arr.iter().copied().collect()).map(Tensor::Float64);
        }
        if let Ok(arr) = output.to_array_view::<i64>() {
            return from_tract(arr.shape(), arr.iter().copied().collect()).map(Tensor::Int64);
        }
        if let Ok(arr) = output.to_array_view::<i32>() {
            return from_tract(arr.shape(), arr.iter().copied().collect()).map(Tensor::Int32);
        }
        if let Ok(arr) = output.to_array_view::<u8>() {
            return from_tract(arr.shape(), arr.iter().copied().collect()).map(Tensor::Uint8);
        }
        Err(InferenceError::OutputExtraction(format!(
            "unsupported output type for '{}'",
            name
        )))
    }
}

fn to_tract<T: Datum>(shape: &[usize], data: Vec<T>) -> Result<TValue> {
    let arr = tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(shape), data)
        .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
    Ok(arr.into_tvalue())
}

fn from_tract<T>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), data)
        .map_err(|e| InferenceError::OutputExtraction(e.to_string()))
}

impl InferenceBackend for TractBackend {
    fn run(&self, inputs: &[(&str, Tensor)]) -> Result<Vec<(String, Tensor)>> {
        let tract_inputs: TVec<TValue> = self
            .input_names
            .iter()
            .map(|expected| {
                let (_, tensor) = inputs
                    .iter()
                    .find(|(name, _)| *name == expected.as_str())
                    .ok_or_else(|| {
                        InferenceError::InvalidInput(format!("missing input '{}'", expected))
                    })?;
                Self::convert_input(tensor)
            })
            .collect::<Result<TVec<_>>>()?;

        let outputs = self
            .model
            .run(tract_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());
        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .output_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("output_{}", idx));
            let tensor = Self::convert_output(&name, output)?;
            results.push((name, tensor));
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
