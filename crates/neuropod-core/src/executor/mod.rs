//! Loading packages and running inference against them.

mod runtime;

#[cfg(any(feature = "native", feature = "pure"))]
pub use runtime::OnnxLoader;
pub use runtime::{LoadContext, RuntimeLoader, Runtimes};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use neuropod_inference::{InferenceBackend, Tensor};
use tracing::{debug, info, warn};

use crate::backends::Backend;
use crate::error::{ExecutorError, Result};
use crate::layout::{BackendConfig, NeuropodConfig, PackageLayout};
use crate::models::config::LoadOptions;
use crate::models::spec::{NodeNameMapping, TensorSpec};

/// Tensors keyed by spec name.
pub type TensorMap = BTreeMap<String, Tensor>;

/// How spec names reach the native runtime.
#[derive(Debug, Clone)]
enum Binding {
    /// Feed and fetch by native identifier.
    Named(NodeNameMapping),
    /// Feed in input-spec order under these native names; outputs come
    /// back in output-spec order.
    Positional(Vec<String>),
}

/// A loaded package serving inference calls.
///
/// `forward` takes `&self` and adds no locking; concurrent calls are as
/// safe as the underlying runtime handle.
pub struct NeuropodExecutor {
    layout: PackageLayout,
    config: NeuropodConfig,
    backend: Backend,
    binding: Binding,
    runtime: Box<dyn InferenceBackend>,
}

impl NeuropodExecutor {
    /// Load the package at `path` with a loader from `runtimes`.
    pub fn load(
        path: impl AsRef<Path>,
        runtimes: &Runtimes,
        options: &LoadOptions,
    ) -> Result<Self> {
        let layout = PackageLayout::new(path.as_ref());
        let config = layout.read_neuropod_config()?;
        let backend: Backend = config.platform.parse()?;

        let backend_config = layout.read_backend_config()?;
        let binding = read_binding(&layout, backend, &config, &backend_config)?;
        let artifacts = backend.locate_artifacts(&layout, &backend_config)?;
        debug!("Located {} artifacts: {:?}", backend, artifacts);

        let context = load_context(&layout, options)?;
        let loader = runtimes
            .get(backend)
            .ok_or(ExecutorError::NoRuntime(backend.tag()))?;
        let runtime = loader.load(&artifacts, &context)?;
        debug!(
            "Runtime reports inputs {:?} and outputs {:?}",
            runtime.input_names(),
            runtime.output_names()
        );

        info!(
            "Loaded {} neuropod '{}' from {}",
            backend,
            config.name,
            layout.root().display()
        );

        Ok(Self {
            layout,
            config,
            backend,
            binding,
            runtime,
        })
    }

    /// Run inference.
    ///
    /// Input-spec names absent from `inputs` are left out of the native
    /// feed; whether that is acceptable is up to the runtime. Keys outside
    /// the input spec are ignored. Every output is returned with its
    /// declared dtype.
    pub fn forward(&self, inputs: &TensorMap) -> Result<TensorMap> {
        for key in inputs.keys() {
            if !self.config.input_spec.iter().any(|t| &t.name == key) {
                warn!("Ignoring input `{}` not in the input spec", key);
            }
        }

        match &self.binding {
            Binding::Named(mapping) => self.forward_named(mapping, inputs),
            Binding::Positional(native_inputs) => self.forward_positional(native_inputs, inputs),
        }
    }

    fn forward_named(&self, mapping: &NodeNameMapping, inputs: &TensorMap) -> Result<TensorMap> {
        let mut feed: Vec<(&str, Tensor)> = Vec::with_capacity(inputs.len());
        for spec in &self.config.input_spec {
            let Some(value) = inputs.get(&spec.name) else {
                continue;
            };
            feed.push((resolve(mapping, &spec.name)?, value.clone()));
        }

        debug!(
            "Feeding {:?}",
            feed.iter().map(|(name, _)| *name).collect::<Vec<_>>()
        );
        let native_out: HashMap<String, Tensor> = self.runtime.run(&feed)?.into_iter().collect();

        // Several spec names may share one native output.
        let mut outputs = TensorMap::new();
        for spec in &self.config.output_spec {
            let native = resolve(mapping, &spec.name)?;
            let value = native_out
                .get(native)
                .ok_or_else(|| ExecutorError::MissingOutput {
                    name: spec.name.clone(),
                    native: native.to_string(),
                })?;
            outputs.insert(spec.name.clone(), conform(spec, value));
        }
        Ok(outputs)
    }

    fn forward_positional(&self, native_inputs: &[String], inputs: &TensorMap) -> Result<TensorMap> {
        let feed: Vec<(&str, Tensor)> = self
            .config
            .input_spec
            .iter()
            .zip(native_inputs)
            .filter_map(|(spec, native)| {
                inputs
                    .get(&spec.name)
                    .map(|value| (native.as_str(), value.clone()))
            })
            .collect();

        debug!(
            "Feeding {:?}",
            feed.iter().map(|(name, _)| *name).collect::<Vec<_>>()
        );
        let mut native_out = self.runtime.run(&feed)?.into_iter();

        let mut outputs = TensorMap::new();
        for (idx, spec) in self.config.output_spec.iter().enumerate() {
            let (_, value) = native_out.next().ok_or_else(|| ExecutorError::MissingOutput {
                name: spec.name.clone(),
                native: format!("#{}", idx),
            })?;
            outputs.insert(spec.name.clone(), conform(spec, &value));
        }
        Ok(outputs)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn path(&self) -> &Path {
        self.layout.root()
    }

    pub fn input_spec(&self) -> &[TensorSpec] {
        &self.config.input_spec
    }

    pub fn output_spec(&self) -> &[TensorSpec] {
        &self.config.output_spec
    }
}

fn resolve<'a>(mapping: &'a NodeNameMapping, name: &str) -> Result<&'a str> {
    mapping.get(name).ok_or_else(|| {
        ExecutorError::MissingNodeMapping {
            name: name.to_string(),
        }
        .into()
    })
}

/// Cast a native output to its declared dtype.
fn conform(spec: &TensorSpec, value: &Tensor) -> Tensor {
    let declared = spec.dtype.tensor_type();
    if value.dtype() != declared {
        debug!("Casting `{}` from {} to {}", spec.name, value.dtype(), declared);
    }
    value.cast(declared)
}

fn read_binding(
    layout: &PackageLayout,
    backend: Backend,
    config: &NeuropodConfig,
    backend_config: &BackendConfig,
) -> Result<Binding> {
    let corrupt = |reason: String| ExecutorError::ConfigCorrupt {
        path: layout.backend_config_path(),
        reason,
    };

    if backend.is_positional() {
        let inputs = backend_config
            .inputs
            .clone()
            .ok_or_else(|| corrupt("missing `inputs`".to_string()))?;
        if inputs.len() != config.input_spec.len() {
            return Err(corrupt(format!(
                "`inputs` has {} entries but the input spec has {}",
                inputs.len(),
                config.input_spec.len()
            ))
            .into());
        }
        return Ok(Binding::Positional(inputs));
    }

    let mapping = backend_config
        .node_name_mapping
        .clone()
        .ok_or_else(|| corrupt("missing `node_name_mapping`".to_string()))?;

    // Packages may come from foreign packagers; re-check the mapping here.
    for spec in config.output_spec.iter().chain(&config.input_spec) {
        resolve(&mapping, &spec.name)?;
    }
    Ok(Binding::Named(mapping))
}

fn load_context(layout: &PackageLayout, options: &LoadOptions) -> Result<LoadContext> {
    let root = layout.root().canonicalize()?;
    let code_dir = root.join(crate::layout::PACKAGE_VERSION).join("code");

    let mut search_paths = Vec::new();
    if options.load_custom_ops && code_dir.is_dir() {
        search_paths.push(code_dir);
    }
    search_paths.extend(options.extra_search_paths.iter().cloned());

    Ok(LoadContext {
        search_paths,
        namespace: root.display().to_string(),
        onnx: options.onnx,
    })
}
