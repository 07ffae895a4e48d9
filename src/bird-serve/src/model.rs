use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{error, info};
use serde::Serialize;
use tensorflow::{
    Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Status, Tensor,
};
use thiserror::Error;

use crate::config::GraphSpec;
use crate::labels::BIRD_SPECIES;
use crate::timer::Timer;

/// Substrings TensorFlow (and older exporters) emit when a graph pins work
/// to hardware this process does not have.
const DEVICE_MISMATCH_MARKERS: &[&str] = &[
    "Could not satisfy explicit device specification",
    "no supported kernel for GPU devices",
    "CPU-only machine",
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    /// Category set entry with the highest score
    pub label: String,

    /// Position of `label` in the category set
    pub index: usize,

    /// Raw score reported by the model for `label`
    pub probability: f32,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced no scores")]
    EmptyOutput,

    #[error("score index {index} has no label among {labels} categories")]
    UnknownIndex { index: usize, labels: usize },
}

#[derive(Debug, Error)]
pub enum LoadError {
    /// The artifact expects an execution target this machine lacks.
    #[error("{remediation}")]
    EnvironmentMismatch {
        remediation: String,
        #[source]
        cause: Status,
    },

    #[error("model emits {actual} scores but {expected} categories are configured")]
    LabelMismatch { expected: usize, actual: usize },

    #[error("could not read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other TensorFlow failure, passed through as reported.
    #[error("{0}")]
    Unclassified(#[source] Status),
}

impl LoadError {
    /// Sort a TensorFlow failure into mismatch or unclassified.
    ///
    /// TensorFlow reports placement problems with generic status codes, so
    /// this is a best-effort match on the message text.
    pub fn from_status(status: Status, artifact: &Path) -> Self {
        classify_failure(status, artifact)
    }

    pub fn is_environment_mismatch(&self) -> bool {
        matches!(self, LoadError::EnvironmentMismatch { .. })
    }
}

pub fn classify_failure(status: Status, artifact: &Path) -> LoadError {
    let message = status.to_string();

    if !DEVICE_MISMATCH_MARKERS.iter().any(|m| message.contains(m)) {
        return LoadError::Unclassified(status);
    }

    error!("{:?}: {}", status.code(), message);

    let remediation = format!(
        "\n\nThe model at {} was exported with operations pinned to accelerator hardware that \
         is not available on this machine.\n\nExport the model again with device placement \
         cleared (or from a CPU-only environment) and replace the artifact, then restart the \
         service.",
        artifact.display()
    );

    LoadError::EnvironmentMismatch {
        remediation,
        cause: status,
    }
}

/// Anything that can map a decoded image to a category.
///
/// Implementations are shared by every request, so `predict` only gets `&self`.
pub trait Predictor: Send + Sync + 'static {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, PredictError>;
}

pub struct ImageClassifier {
    /// TensorFlow model graph
    graph: Graph,

    /// TensorFlow session
    session: Session,

    /// Graph endpoints
    spec: GraphSpec,

    /// Category names, index-aligned with the output scores
    labels: &'static [&'static str],
}

impl ImageClassifier {
    /// Import a frozen `GraphDef` from `path` and run one warm-up inference.
    pub fn load(
        path: &Path,
        spec: &GraphSpec,
        labels: &'static [&'static str],
    ) -> Result<Self, LoadError> {
        let mut t = Timer::new_start("Loading model");

        let graph_def = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let tf_error = |status: Status| LoadError::from_status(status, path);

        let mut graph = Graph::new();
        graph
            .import_graph_def(&graph_def, &ImportGraphDefOptions::new())
            .map_err(tf_error)?;
        let session = Session::new(&SessionOptions::new(), &graph).map_err(tf_error)?;

        let classifier = ImageClassifier {
            graph,
            session,
            spec: spec.clone(),
            labels,
        };

        // Placement errors only show up once the graph actually runs.
        let side = spec.input_size as usize;
        let scores = classifier
            .run(&vec![0f32; side * side * 3])
            .map_err(tf_error)?;

        if scores.len() != labels.len() {
            return Err(LoadError::LabelMismatch {
                expected: labels.len(),
                actual: scores.len(),
            });
        }

        t.stop();
        info!(
            "Loaded {} ({} categories)",
            path.display(),
            classifier.labels.len()
        );

        Ok(classifier)
    }

    fn run(&self, image: &[f32]) -> tensorflow::Result<Vec<f32>> {
        let size = u64::from(self.spec.input_size);
        let input = Tensor::new(&[1, size, size, 3]).with_values(image)?;

        let mut args = SessionRunArgs::new();

        args.add_feed(
            &self.graph.operation_by_name_required(&self.spec.input_op)?,
            0,
            &input,
        );

        let result = args.request_fetch(
            &self.graph.operation_by_name_required(&self.spec.output_op)?,
            0,
        );

        self.session.run(&mut args)?;
        let output: Tensor<f32> = args.fetch(result)?;

        Ok(output.to_vec())
    }
}

impl Predictor for ImageClassifier {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, PredictError> {
        let mut t = Timer::new_start("Resizing image");
        let input = preprocess(image, self.spec.input_size);
        t.stop();

        let mut t = Timer::new_start("Running session");
        let scores = self
            .run(&input)
            .map_err(|status| PredictError::Inference(status.to_string()))?;
        t.stop();

        top_prediction(&scores, self.labels)
    }
}

/// Load the artifact `directory/file_name` with the bundled bird categories.
pub fn load_model(
    directory: &Path,
    file_name: &str,
    spec: &GraphSpec,
) -> Result<ImageClassifier, LoadError> {
    ImageClassifier::load(&directory.join(file_name), spec, BIRD_SPECIES)
}

/// RGB pixels resized to `size`x`size`, scaled to [0, 1], in NHWC order.
pub fn preprocess(image: &DynamicImage, size: u32) -> Vec<f32> {
    let rgb = image.to_rgb8();

    let resized = image::imageops::resize(&rgb, size, size, image::imageops::FilterType::Triangle);

    resized
        .into_raw()
        .iter()
        .map(|x| *x as f32 / 255f32)
        .collect()
}

pub fn top_prediction(scores: &[f32], labels: &[&str]) -> Result<Prediction, PredictError> {
    let (index, probability) = scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or(PredictError::EmptyOutput)?;

    let label = labels.get(index).ok_or(PredictError::UnknownIndex {
        index,
        labels: labels.len(),
    })?;

    Ok(Prediction {
        label: label.to_string(),
        index,
        probability: *probability,
    })
}
