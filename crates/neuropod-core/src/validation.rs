//! Checks shared by every packager before anything is written.

use std::collections::{BTreeSet, HashSet};

use crate::error::PackagingError;
use crate::models::spec::{NodeNameMapping, TensorSpec};

/// Verify that `mapping` has an entry for every tensor in both specs.
///
/// On failure the error lists every missing name, sorted.
pub fn validate_node_name_mapping(
    input_spec: &[TensorSpec],
    output_spec: &[TensorSpec],
    mapping: &NodeNameMapping,
) -> Result<(), PackagingError> {
    let missing: BTreeSet<&str> = input_spec
        .iter()
        .chain(output_spec)
        .map(|t| t.name.as_str())
        .filter(|name| !mapping.contains(name))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(PackagingError::SpecMismatch {
        missing: missing.into_iter().map(str::to_string).collect(),
    })
}

/// Reject specs that declare the same name twice.
pub fn validate_tensor_specs(
    input_spec: &[TensorSpec],
    output_spec: &[TensorSpec],
) -> Result<(), PackagingError> {
    check_unique("input_spec", input_spec)?;
    check_unique("output_spec", output_spec)
}

fn check_unique(spec: &'static str, tensors: &[TensorSpec]) -> Result<(), PackagingError> {
    let mut seen = HashSet::with_capacity(tensors.len());
    for tensor in tensors {
        if !seen.insert(tensor.name.as_str()) {
            return Err(PackagingError::DuplicateSpecName {
                spec,
                name: tensor.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::spec::{DType, Dim};
    use pretty_assertions::assert_eq;

    fn spec(names: &[&str]) -> Vec<TensorSpec> {
        names
            .iter()
            .map(|n| TensorSpec::new(*n, DType::Float32, vec![Dim::Symbol("batch".into())]))
            .collect()
    }

    fn missing(result: Result<(), PackagingError>) -> Vec<String> {
        match result {
            Err(PackagingError::SpecMismatch { missing }) => missing,
            other => panic!("expected SpecMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_mapping_passes() {
        let mapping = [("x", "X"), ("y", "Y"), ("out", "Z")].into_iter().collect();
        assert!(validate_node_name_mapping(&spec(&["x", "y"]), &spec(&["out"]), &mapping).is_ok());
    }

    #[test]
    fn test_extra_keys_tolerated() {
        let mapping = [("x", "X"), ("out", "Z"), ("unused", "U")]
            .into_iter()
            .collect();
        assert!(validate_node_name_mapping(&spec(&["x"]), &spec(&["out"]), &mapping).is_ok());
    }

    #[test]
    fn test_missing_single_name() {
        let mapping = [("x", "X"), ("out", "Z")].into_iter().collect();
        let result = validate_node_name_mapping(&spec(&["x", "y"]), &spec(&["out"]), &mapping);
        assert_eq!(missing(result), vec!["y".to_string()]);
    }

    #[test]
    fn test_reports_every_missing_name_sorted() {
        let mapping = NodeNameMapping::new();
        let result = validate_node_name_mapping(&spec(&["y", "x"]), &spec(&["out"]), &mapping);
        assert_eq!(missing(result), vec!["out", "x", "y"]);
    }

    #[test]
    fn test_name_shared_by_input_and_output_reported_once() {
        let mapping = NodeNameMapping::new();
        let result = validate_node_name_mapping(&spec(&["x"]), &spec(&["x"]), &mapping);
        assert_eq!(missing(result), vec!["x"]);
    }

    #[test]
    fn test_duplicate_spec_name_rejected() {
        let err = validate_tensor_specs(&spec(&["x", "x"]), &spec(&["out"])).unwrap_err();
        assert!(matches!(
            err,
            PackagingError::DuplicateSpecName { spec: "input_spec", ref name } if name == "x"
        ));
    }

    #[test]
    fn test_same_name_across_specs_allowed() {
        assert!(validate_tensor_specs(&spec(&["x"]), &spec(&["x"])).is_ok());
    }
}
