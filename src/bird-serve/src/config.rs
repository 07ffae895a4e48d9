//! Deployment defaults for the classifier service.
//!
//! The binaries expose these as command line options with environment
//! variable fallbacks; the library only needs the resolved values.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the exported bird classifier graph is published.
///
/// This location historically served a fastai `export.pkl`, which cannot be
/// imported here. The default only works once the classifier has been
/// re-exported as a frozen TensorFlow `GraphDef` and published at this URL;
/// until then point `--model-url` (or `BIRD_MODEL_URL`) at such a graph.
pub const DEFAULT_MODEL_URL: &str =
    "https://drive.google.com/uc?export=download&id=1WMOOWAve4V60LQf4gkaGG1QqVxrNX6L0";

pub const DEFAULT_MODEL_FILE: &str = "export.pb";
pub const DEFAULT_MODEL_DIR: &str = ".";

pub const DEFAULT_INPUT_OP: &str = "serving_default_input_1";
pub const DEFAULT_OUTPUT_OP: &str = "StatefulPartitionedCall";
pub const DEFAULT_INPUT_SIZE: u32 = 224;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

/// Remote location and local cache slot of the model artifact.
///
/// The local path is always `directory/file_name`; a relative directory
/// resolves against the working directory of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRef {
    pub url: String,
    pub directory: PathBuf,
    pub file_name: String,
}

impl ArtifactRef {
    pub fn new(url: &str, directory: &Path, file_name: &str) -> Self {
        ArtifactRef {
            url: url.to_owned(),
            directory: directory.to_path_buf(),
            file_name: file_name.to_owned(),
        }
    }

    pub fn local_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

impl Default for ArtifactRef {
    fn default() -> Self {
        ArtifactRef::new(
            DEFAULT_MODEL_URL,
            Path::new(DEFAULT_MODEL_DIR),
            DEFAULT_MODEL_FILE,
        )
    }
}

/// Names and shape of the graph endpoints used for inference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphSpec {
    /// Operation fed with the NHWC image tensor
    pub input_op: String,

    /// Operation producing the per-category scores
    pub output_op: String,

    /// Side length of the square input image
    pub input_size: u32,
}

impl Default for GraphSpec {
    fn default() -> Self {
        GraphSpec {
            input_op: DEFAULT_INPUT_OP.to_owned(),
            output_op: DEFAULT_OUTPUT_OP.to_owned(),
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

pub fn default_fetch_timeout() -> Duration {
    Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)
}
