//! Caffe2 packages: an init net holding weights and a predict net.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::{ArtifactSet, require_file, required_artifact};
use crate::error::{PackagingError, Result};
use crate::layout::PackageLayout;

const BACKEND: &str = "caffe2";
pub const INIT_NET_FILE: &str = "init_net.pb";
pub const PREDICT_NET_FILE: &str = "predict_net.pb";

/// Packaging options for the Caffe2 backend. Both nets are required.
#[derive(Debug, Clone)]
pub struct Caffe2Options {
    /// Protobuf defining the network.
    pub predict_net: PathBuf,
    /// Protobuf holding the network weights.
    pub init_net: PathBuf,
}

impl Caffe2Options {
    pub fn new(predict_net: impl Into<PathBuf>, init_net: impl Into<PathBuf>) -> Self {
        Self {
            predict_net: predict_net.into(),
            init_net: init_net.into(),
        }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), PackagingError> {
        require_file(BACKEND, "predict_net", &self.predict_net)?;
        require_file(BACKEND, "init_net", &self.init_net)
    }

    pub(crate) fn write_artifacts(&self, layout: &PackageLayout) -> Result<()> {
        debug!(
            "Copying Caffe2 nets {} and {}",
            self.init_net.display(),
            self.predict_net.display()
        );
        fs::copy(&self.init_net, layout.data_file(INIT_NET_FILE))?;
        fs::copy(&self.predict_net, layout.data_file(PREDICT_NET_FILE))?;
        Ok(())
    }
}

pub(crate) fn locate_artifacts(layout: &PackageLayout) -> Result<ArtifactSet> {
    Ok(ArtifactSet::Caffe2 {
        init_net: required_artifact(layout.data_file(INIT_NET_FILE))?,
        predict_net: required_artifact(layout.data_file(PREDICT_NET_FILE))?,
    })
}
