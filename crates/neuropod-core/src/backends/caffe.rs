//! Caffe packages: a deploy prototxt plus optional binaryproto weights.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::{ArtifactSet, optional_artifact, require_file, required_artifact};
use crate::error::{PackagingError, Result};
use crate::layout::PackageLayout;

const BACKEND: &str = "caffe";
pub const PROTOTXT_FILE: &str = "model.prototxt";
pub const CAFFEMODEL_FILE: &str = "model.caffemodel";

/// Packaging options for the Caffe backend.
#[derive(Debug, Clone)]
pub struct CaffeOptions {
    /// Required. Deploy-time network definition.
    pub prototxt: PathBuf,
    /// Optional. Trained weights; without them the net is loaded from
    /// the prototxt alone.
    pub caffemodel: Option<PathBuf>,
}

impl CaffeOptions {
    pub fn new(prototxt: impl Into<PathBuf>) -> Self {
        Self {
            prototxt: prototxt.into(),
            caffemodel: None,
        }
    }

    pub fn with_caffemodel(mut self, caffemodel: impl Into<PathBuf>) -> Self {
        self.caffemodel = Some(caffemodel.into());
        self
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), PackagingError> {
        require_file(BACKEND, "prototxt", &self.prototxt)?;
        if let Some(caffemodel) = &self.caffemodel {
            require_file(BACKEND, "caffemodel", caffemodel)?;
        }
        Ok(())
    }

    pub(crate) fn write_artifacts(&self, layout: &PackageLayout) -> Result<()> {
        debug!("Copying Caffe prototxt {}", self.prototxt.display());
        fs::copy(&self.prototxt, layout.data_file(PROTOTXT_FILE))?;
        if let Some(caffemodel) = &self.caffemodel {
            debug!("Copying Caffe weights {}", caffemodel.display());
            fs::copy(caffemodel, layout.data_file(CAFFEMODEL_FILE))?;
        }
        Ok(())
    }
}

pub(crate) fn locate_artifacts(layout: &PackageLayout) -> Result<ArtifactSet> {
    Ok(ArtifactSet::Caffe {
        prototxt: required_artifact(layout.data_file(PROTOTXT_FILE))?,
        caffemodel: optional_artifact(layout.data_file(CAFFEMODEL_FILE)),
    })
}
