//! Dense tensors exchanged with a native runtime.

use std::fmt;

use ndarray::{ArrayD, IxDyn};

use crate::error::InferenceError;
use crate::Result;

/// Supported tensor data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorType {
    Float32,
    Float64,
    Int32,
    Int64,
    Uint8,
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorType::Float32 => write!(f, "float32"),
            TensorType::Float64 => write!(f, "float64"),
            TensorType::Int32 => write!(f, "int32"),
            TensorType::Int64 => write!(f, "int64"),
            TensorType::Uint8 => write!(f, "uint8"),
        }
    }
}

/// A dense numeric array fed to or read back from a native runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Uint8(ArrayD<u8>),
}

// Element-wise `as` conversion of every variant into `ArrayD<$t>`.
macro_rules! convert_elements {
    ($tensor:expr, $t:ty) => {
        match $tensor {
            Tensor::Float32(arr) => arr.mapv(|v| v as $t),
            Tensor::Float64(arr) => arr.mapv(|v| v as $t),
            Tensor::Int32(arr) => arr.mapv(|v| v as $t),
            Tensor::Int64(arr) => arr.mapv(|v| v as $t),
            Tensor::Uint8(arr) => arr.mapv(|v| v as $t),
        }
    };
}

impl Tensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Float32(arr) => arr.shape(),
            Tensor::Float64(arr) => arr.shape(),
            Tensor::Int32(arr) => arr.shape(),
            Tensor::Int64(arr) => arr.shape(),
            Tensor::Uint8(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            Tensor::Float32(_) => TensorType::Float32,
            Tensor::Float64(_) => TensorType::Float64,
            Tensor::Int32(_) => TensorType::Int32,
            Tensor::Int64(_) => TensorType::Int64,
            Tensor::Uint8(_) => TensorType::Uint8,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a Float32 tensor from raw data and shape.
    pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Tensor::Float32)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Create a Float64 tensor from raw data and shape.
    pub fn from_f64(data: Vec<f64>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Tensor::Float64)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Create an Int32 tensor from raw data and shape.
    pub fn from_i32(data: Vec<i32>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Tensor::Int32)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Create an Int64 tensor from raw data and shape.
    pub fn from_i64(data: Vec<i64>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Tensor::Int64)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Create a Uint8 tensor from raw data and shape.
    pub fn from_u8(data: Vec<u8>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Tensor::Uint8)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Convert the tensor to `dtype`.
    ///
    /// Returns a clone when the dtype already matches. Conversions use
    /// Rust `as` semantics, so narrowing casts truncate or saturate.
    pub fn cast(&self, dtype: TensorType) -> Tensor {
        if self.dtype() == dtype {
            return self.clone();
        }
        match dtype {
            TensorType::Float32 => Tensor::Float32(convert_elements!(self, f32)),
            TensorType::Float64 => Tensor::Float64(convert_elements!(self, f64)),
            TensorType::Int32 => Tensor::Int32(convert_elements!(self, i32)),
            TensorType::Int64 => Tensor::Int64(convert_elements!(self, i64)),
            TensorType::Uint8 => Tensor::Uint8(convert_elements!(self, u8)),
        }
    }

    /// Flatten into `f64` values in logical (row-major) order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        convert_elements!(self, f64).iter().copied().collect()
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(arr: ArrayD<f32>) -> Self {
        Tensor::Float32(arr)
    }
}

impl From<ArrayD<f64>> for Tensor {
    fn from(arr: ArrayD<f64>) -> Self {
        Tensor::Float64(arr)
    }
}

impl From<ArrayD<i32>> for Tensor {
    fn from(arr: ArrayD<i32>) -> Self {
        Tensor::Int32(arr)
    }
}

impl From<ArrayD<i64>> for Tensor {
    fn from(arr: ArrayD<i64>) -> Self {
        Tensor::Int64(arr)
    }
}

impl From<ArrayD<u8>> for Tensor {
    fn from(arr: ArrayD<u8>) -> Self {
        Tensor::Uint8(arr)
    }
}
