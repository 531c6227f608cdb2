//! In-process checks that a package loads and produces expected output.

use std::path::Path;

use tracing::info;

use crate::error::{EvalError, Result};
use crate::executor::{NeuropodExecutor, Runtimes, TensorMap};
use crate::models::config::LoadOptions;

/// Relative tolerance used by [`check_output_matches_expected`].
pub const RTOL: f64 = 1e-5;
/// Absolute tolerance used by [`check_output_matches_expected`].
pub const ATOL: f64 = 1e-8;

/// Compare every expected output against `out` with `allclose` semantics:
/// `|a - b| <= ATOL + RTOL * |b|` element-wise, NaN never matching.
pub fn check_output_matches_expected(
    out: &TensorMap,
    expected: &TensorMap,
) -> std::result::Result<(), EvalError> {
    for (name, want) in expected {
        let got = out.get(name).ok_or_else(|| EvalError::Missing(name.clone()))?;

        if got.shape() != want.shape() {
            return Err(EvalError::Mismatch {
                name: name.clone(),
                reason: format!("shape {:?} != {:?}", got.shape(), want.shape()),
            });
        }

        let close = got
            .to_f64_vec()
            .into_iter()
            .zip(want.to_f64_vec())
            .all(|(a, b)| (a - b).abs() <= ATOL + RTOL * b.abs());
        if !close {
            return Err(EvalError::Mismatch {
                name: name.clone(),
                reason: "values differ".to_string(),
            });
        }
    }
    Ok(())
}

/// Log the shape and dtype of every output.
pub fn print_output_summary(out: &TensorMap) {
    info!("No expected test output specified; printing summary");
    for (name, value) in out {
        info!("\t{}: array with shape {:?} and dtype {}", name, value.shape(), value.dtype());
    }
}

/// Load a package, run it once on `inputs`, and verify the result.
///
/// Without `expected` the outputs are only summarized. Returns the
/// outputs either way.
pub fn load_and_test_neuropod(
    path: impl AsRef<Path>,
    runtimes: &Runtimes,
    options: &LoadOptions,
    inputs: &TensorMap,
    expected: Option<&TensorMap>,
) -> Result<TensorMap> {
    let executor = NeuropodExecutor::load(path, runtimes, options)?;
    let out = executor.forward(inputs)?;

    match expected {
        Some(expected) => check_output_matches_expected(&out, expected)?,
        None => print_output_summary(&out),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuropod_inference::Tensor;

    fn map(name: &str, tensor: Tensor) -> TensorMap {
        [(name.to_string(), tensor)].into_iter().collect()
    }

    #[test]
    fn test_allclose_within_tolerance() {
        let out = map("out", Tensor::from_f32(vec![1.0, 2.0], &[2]).unwrap());
        let expected = map("out", Tensor::from_f64(vec![1.0, 2.000001], &[2]).unwrap());
        assert!(check_output_matches_expected(&out, &expected).is_ok());
    }

    #[test]
    fn test_value_mismatch() {
        let out = map("out", Tensor::from_f32(vec![1.0, 2.0], &[2]).unwrap());
        let expected = map("out", Tensor::from_f32(vec![1.0, 3.0], &[2]).unwrap());
        assert!(matches!(
            check_output_matches_expected(&out, &expected),
            Err(EvalError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let out = map("out", Tensor::from_f32(vec![1.0, 2.0], &[2]).unwrap());
        let expected = map("out", Tensor::from_f32(vec![1.0, 2.0], &[1, 2]).unwrap());
        assert!(matches!(
            check_output_matches_expected(&out, &expected),
            Err(EvalError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_missing_output() {
        let out = TensorMap::new();
        let expected = map("out", Tensor::from_f32(vec![1.0], &[1]).unwrap());
        assert!(matches!(
            check_output_matches_expected(&out, &expected),
            Err(EvalError::Missing(ref name)) if name == "out"
        ));
    }

    #[test]
    fn test_nan_never_matches() {
        let out = map("out", Tensor::from_f32(vec![f32::NAN], &[1]).unwrap());
        let expected = map("out", Tensor::from_f32(vec![f32::NAN], &[1]).unwrap());
        assert!(check_output_matches_expected(&out, &expected).is_err());
    }
}
