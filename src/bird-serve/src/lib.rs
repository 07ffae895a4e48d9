pub mod config;
pub mod fetch;
pub mod handler;
pub mod labels;
pub mod model;
pub mod state;
mod timer;

pub use config::{ArtifactRef, GraphSpec};
pub use fetch::{ensure_artifact, FetchError, FetchOutcome, Fetcher};
pub use handler::{classify_bytes, handle_classification, ClassificationResult, ClassifyError};
pub use labels::BIRD_SPECIES;
pub use model::{load_model, ImageClassifier, LoadError, PredictError, Prediction, Predictor};
pub use state::{bootstrap, ModelState, StartupError};
pub use timer::Timer;
