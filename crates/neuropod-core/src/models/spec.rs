//! Tensor specs and the node name mapping.

use std::collections::BTreeMap;
use std::fmt;

use neuropod_inference::TensorType;
use serde::{Deserialize, Serialize};

/// Element type declared for a tensor in a package spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Float64,
    Int32,
    Int64,
    Uint8,
}

impl DType {
    /// The runtime tensor type carrying this dtype.
    pub fn tensor_type(self) -> TensorType {
        match self {
            DType::Float32 => TensorType::Float32,
            DType::Float64 => TensorType::Float64,
            DType::Int32 => TensorType::Int32,
            DType::Int64 => TensorType::Int64,
            DType::Uint8 => TensorType::Uint8,
        }
    }
}

impl From<TensorType> for DType {
    fn from(t: TensorType) -> Self {
        match t {
            TensorType::Float32 => DType::Float32,
            TensorType::Float64 => DType::Float64,
            TensorType::Int32 => DType::Int32,
            TensorType::Int64 => DType::Int64,
            TensorType::Uint8 => DType::Uint8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tensor_type(), f)
    }
}

/// One dimension of a declared shape.
///
/// Serialized as a JSON integer, a string naming a symbolic dimension
/// (e.g. a batch size shared between tensors), or `null` for "any".
/// `-1` is read as "any" as well, since many exporters write it that way;
/// it is written back as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawDim")]
pub enum Dim {
    Fixed(u64),
    Symbol(String),
    Any,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDim {
    Int(i64),
    Symbol(String),
    Any,
}

impl TryFrom<RawDim> for Dim {
    type Error = String;

    fn try_from(raw: RawDim) -> Result<Self, Self::Error> {
        match raw {
            RawDim::Int(-1) | RawDim::Any => Ok(Dim::Any),
            RawDim::Int(n) => u64::try_from(n)
                .map(Dim::Fixed)
                .map_err(|_| format!("invalid dimension {}", n)),
            RawDim::Symbol(symbol) => Ok(Dim::Symbol(symbol)),
        }
    }
}

/// A named, typed, shaped tensor in a package's public contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<Dim>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, dtype: DType, shape: Vec<Dim>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
        }
    }
}

/// Binding from spec names to backend-native tensor identifiers.
///
/// Keys not present in either spec are kept but never used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeNameMapping(BTreeMap<String, String>);

impl NodeNameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, native: impl Into<String>) {
        self.0.insert(name.into(), native.into());
    }

    /// Native identifier bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NodeNameMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tensor_spec_json_shape() {
        let spec = TensorSpec::new(
            "x",
            DType::Float32,
            vec![Dim::Symbol("batch".to_string()), Dim::Fixed(3), Dim::Any],
        );
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "x", "dtype": "float32", "shape": ["batch", 3, null]})
        );

        let back: TensorSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_node_name_mapping_is_plain_object() {
        let mapping: NodeNameMapping = [("x", "X"), ("out", "Z")].into_iter().collect();
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"out":"Z","x":"X"}"#);
        assert_eq!(mapping.get("x"), Some("X"));
        assert!(!mapping.contains("y"));
    }

    #[test]
    fn test_negative_one_reads_as_any() {
        let dims: Vec<Dim> = serde_json::from_str(r#"[-1, 3, null, "batch"]"#).unwrap();
        assert_eq!(
            dims,
            vec![Dim::Any, Dim::Fixed(3), Dim::Any, Dim::Symbol("batch".to_string())]
        );
        assert_eq!(serde_json::to_string(&dims[0]).unwrap(), "null");

        assert!(serde_json::from_str::<Dim>("-2").is_err());
    }

    #[test]
    fn test_dtype_tensor_type() {
        assert_eq!(DType::Int64.tensor_type(), TensorType::Int64);
        assert_eq!(DType::from(TensorType::Uint8), DType::Uint8);
        assert_eq!(DType::Float64.to_string(), "float64");
    }
}
