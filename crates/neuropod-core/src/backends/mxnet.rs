//! MXNet packages: an exported symbol graph plus optional parameters.
//!
//! MXNet symbol blocks are called positionally, so the backend config
//! also records the native input names in input-spec order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ArtifactSet, optional_artifact, require_exactly_one, require_file, required_artifact};
use crate::error::{ExecutorError, PackagingError, Result};
use crate::layout::{BackendConfig, PackageLayout};

const BACKEND: &str = "mxnet";
const EXPORT_PREFIX: &str = "model";
pub const SYMBOL_FILE: &str = "model-symbol.json";
pub const PARAMS_FILE: &str = "model-0000.params";

/// An in-memory model that can export itself as symbol and params files.
///
/// `export` receives a path prefix and must write `<prefix>-symbol.json`
/// and, if the model has parameters, `<prefix>-0000.params`.
pub trait SymbolExport: Send + Sync {
    fn export(&self, prefix: &Path) -> std::io::Result<()>;
}

/// Packaging options for the MXNet backend.
///
/// Exactly one of `module` and `symbol_file` must be set. `param_file`
/// may only accompany `symbol_file`.
#[derive(Default)]
pub struct MxnetOptions {
    pub module: Option<Box<dyn SymbolExport>>,
    pub symbol_file: Option<PathBuf>,
    pub param_file: Option<PathBuf>,
}

impl MxnetOptions {
    pub fn from_module(module: impl SymbolExport + 'static) -> Self {
        Self {
            module: Some(Box::new(module)),
            ..Self::default()
        }
    }

    pub fn from_files(symbol_file: impl Into<PathBuf>, param_file: Option<PathBuf>) -> Self {
        Self {
            module: None,
            symbol_file: Some(symbol_file.into()),
            param_file,
        }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), PackagingError> {
        require_exactly_one(
            BACKEND,
            ("module", self.module.is_some()),
            ("symbol_file", self.symbol_file.is_some()),
        )?;
        if let Some(symbol_file) = &self.symbol_file {
            require_file(BACKEND, "symbol_file", symbol_file)?;
        }
        match (&self.param_file, &self.symbol_file) {
            (Some(param_file), Some(_)) => require_file(BACKEND, "param_file", param_file),
            (Some(_), None) => Err(PackagingError::InvalidOptions {
                backend: BACKEND,
                reason: "`param_file` requires `symbol_file`".to_string(),
            }),
            (None, _) => Ok(()),
        }
    }

    pub(crate) fn write_artifacts(&self, layout: &PackageLayout) -> Result<()> {
        let symbol_path = layout.data_file(SYMBOL_FILE);
        let params_path = layout.data_file(PARAMS_FILE);

        if let Some(module) = &self.module {
            let prefix = layout.data_file(EXPORT_PREFIX);
            debug!("Exporting MXNet module to {}", prefix.display());
            module.export(&prefix)?;
            if !symbol_path.is_file() {
                return Err(PackagingError::InvalidOptions {
                    backend: BACKEND,
                    reason: format!("module export did not produce {}", SYMBOL_FILE),
                }
                .into());
            }
        } else if let Some(symbol_file) = &self.symbol_file {
            debug!("Copying MXNet symbol {}", symbol_file.display());
            fs::copy(symbol_file, &symbol_path)?;
            if let Some(param_file) = &self.param_file {
                fs::copy(param_file, &params_path)?;
            }
        } else {
            return Err(PackagingError::ModelSource {
                backend: BACKEND,
                in_memory: "module",
                path: "symbol_file",
            }
            .into());
        }
        Ok(())
    }
}

pub(crate) fn locate_artifacts(
    layout: &PackageLayout,
    backend_config: &BackendConfig,
) -> Result<ArtifactSet> {
    let input_names = backend_config
        .inputs
        .clone()
        .ok_or_else(|| ExecutorError::ConfigCorrupt {
            path: layout.backend_config_path(),
            reason: "missing `inputs`".to_string(),
        })?;

    Ok(ArtifactSet::Mxnet {
        symbol: required_artifact(layout.data_file(SYMBOL_FILE))?,
        params: optional_artifact(layout.data_file(PARAMS_FILE)),
        input_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopExport;

    impl SymbolExport for NoopExport {
        fn export(&self, _prefix: &Path) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_param_file_requires_symbol_file() {
        let options = MxnetOptions {
            module: Some(Box::new(NoopExport)),
            symbol_file: None,
            param_file: Some(PathBuf::from("model-0000.params")),
        };
        assert!(matches!(
            options.validate(),
            Err(PackagingError::InvalidOptions { backend: "mxnet", .. })
        ));
    }

    #[test]
    fn test_export_must_produce_symbol() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = PackageLayout::new(dir.path().join("pkg"));
        layout.create().unwrap();

        let options = MxnetOptions::from_module(NoopExport);
        assert!(options.validate().is_ok());
        assert!(options.write_artifacts(&layout).is_err());
    }
}
