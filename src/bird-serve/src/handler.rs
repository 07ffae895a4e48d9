//! Turns uploaded bytes into a label using the shared predictor.

use image::DynamicImage;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::model::{PredictError, Prediction};
use crate::state::ModelState;
use crate::timer::Timer;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("classification failed: {0}")]
    Predict(#[from] PredictError),

    #[error("classification task aborted: {0}")]
    Aborted(String),
}

impl ClassifyError {
    /// Whether the caller sent something unusable, as opposed to a failure on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClassifyError::Decode(_))
    }
}

/// Response body of a successful classification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub result: String,
}

impl From<Prediction> for ClassificationResult {
    fn from(p: Prediction) -> Self {
        ClassificationResult { result: p.label }
    }
}

/// Decode `data` and predict synchronously on the calling thread.
pub fn classify_bytes(state: &ModelState, data: &[u8]) -> Result<Prediction, ClassifyError> {
    let mut t = Timer::new_start("Load image from memory");
    let image: DynamicImage = image::load_from_memory(data)?;
    t.stop();

    debug!("Decoded {}x{} image", image.width(), image.height());

    Ok(state.predictor().predict(&image)?)
}

/// Classify one upload on the blocking pool so the async dispatcher is
/// never held up by decoding or inference.
pub async fn handle_classification(
    state: &ModelState,
    data: Vec<u8>,
) -> Result<ClassificationResult, ClassifyError> {
    let state = state.clone();

    let prediction = tokio::task::spawn_blocking(move || classify_bytes(&state, &data))
        .await
        .map_err(|e| ClassifyError::Aborted(e.to_string()))??;

    Ok(prediction.into())
}
