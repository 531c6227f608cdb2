//! Building packages.
//!
//! Every backend goes through [`package`], which runs all argument and
//! spec checks before the target directory exists. Only the artifact
//! write step differs between backends.

mod code;

pub use code::CodePathSpec;

use std::path::PathBuf;

use tracing::info;

use crate::backends::BackendOptions;
use crate::error::Result;
use crate::layout::{NeuropodConfig, PackageLayout};
use crate::models::spec::{NodeNameMapping, TensorSpec};
use crate::validation::{validate_node_name_mapping, validate_tensor_specs};

/// Backend-independent description of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Target directory; must not exist yet.
    pub neuropod_path: PathBuf,
    pub model_name: String,
    pub input_spec: Vec<TensorSpec>,
    pub output_spec: Vec<TensorSpec>,
    pub node_name_mapping: NodeNameMapping,
    /// Optional source trees needed by custom ops.
    pub code_path_spec: Vec<CodePathSpec>,
}

impl PackageSpec {
    pub fn new(neuropod_path: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            neuropod_path: neuropod_path.into(),
            model_name: model_name.into(),
            input_spec: Vec::new(),
            output_spec: Vec::new(),
            node_name_mapping: NodeNameMapping::new(),
            code_path_spec: Vec::new(),
        }
    }

    pub fn with_input_spec(mut self, input_spec: Vec<TensorSpec>) -> Self {
        self.input_spec = input_spec;
        self
    }

    pub fn with_output_spec(mut self, output_spec: Vec<TensorSpec>) -> Self {
        self.output_spec = output_spec;
        self
    }

    pub fn with_node_name_mapping(mut self, mapping: NodeNameMapping) -> Self {
        self.node_name_mapping = mapping;
        self
    }

    pub fn with_code_path(mut self, code_path: CodePathSpec) -> Self {
        self.code_path_spec.push(code_path);
        self
    }
}

/// Package a model.
///
/// Fails with `ModelSource`, `InvalidOptions`, `DuplicateSpecName`,
/// `SpecMismatch`, `InvalidCodePath` or `PackageExists` before touching
/// the filesystem. A failure while writing artifacts leaves the partial
/// package in place.
pub fn package(spec: &PackageSpec, options: &BackendOptions) -> Result<PackageLayout> {
    let backend = options.backend();

    options.validate()?;
    validate_tensor_specs(&spec.input_spec, &spec.output_spec)?;
    validate_node_name_mapping(&spec.input_spec, &spec.output_spec, &spec.node_name_mapping)?;
    code::validate_code_paths(&spec.code_path_spec)?;

    let layout = PackageLayout::new(&spec.neuropod_path);
    layout.create()?;

    options.write_artifacts(&layout)?;
    code::copy_code_paths(&spec.code_path_spec, &layout.code_dir())?;

    layout.write_backend_config(
        &options.backend_config(&spec.input_spec, &spec.node_name_mapping),
    )?;
    layout.write_neuropod_config(&NeuropodConfig {
        name: spec.model_name.clone(),
        platform: backend.tag().to_string(),
        input_spec: spec.input_spec.clone(),
        output_spec: spec.output_spec.clone(),
    })?;

    info!(
        "Packaged {} neuropod '{}' at {}",
        backend,
        spec.model_name,
        layout.root().display()
    );
    Ok(layout)
}
