//! The loaded predictor shared by every request for the life of the process.

use std::path::Path;
use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::config::ArtifactRef;
use crate::fetch::{FetchError, FetchOutcome, Fetcher};
use crate::model::{LoadError, Predictor};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not fetch model artifact: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not load model: {0}")]
    Load(#[from] LoadError),

    #[error("model loading was aborted: {0}")]
    Aborted(String),
}

/// Read-only handle to the loaded predictor.
///
/// Cloning shares the same predictor; there is no way to replace it once
/// constructed.
#[derive(Clone)]
pub struct ModelState {
    predictor: Arc<dyn Predictor>,
}

impl ModelState {
    pub fn new<P: Predictor>(predictor: P) -> Self {
        ModelState {
            predictor: Arc::new(predictor),
        }
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }
}

/// Fetch the artifact if needed, then load it with `load` on the blocking
/// pool. Only returns once a usable predictor exists.
pub async fn bootstrap<P, F>(
    fetcher: &Fetcher,
    artifact: &ArtifactRef,
    load: F,
) -> Result<ModelState, StartupError>
where
    P: Predictor,
    F: FnOnce(&Path) -> Result<P, LoadError> + Send + 'static,
{
    let path = artifact.local_path();

    if let FetchOutcome::Downloaded { bytes } = fetcher.ensure(&artifact.url, &path).await? {
        info!("Downloaded model artifact ({} bytes)", bytes);
    }

    let predictor = tokio::task::spawn_blocking(move || load(&path))
        .await
        .map_err(|e| StartupError::Aborted(e.to_string()))??;

    Ok(ModelState::new(predictor))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use image::DynamicImage;

    use crate::model::{PredictError, Prediction};

    struct Fixed(&'static str);

    impl Predictor for Fixed {
        fn predict(&self, _: &DynamicImage) -> Result<Prediction, PredictError> {
            Ok(Prediction {
                label: self.0.to_owned(),
                index: 0,
                probability: 1.0,
            })
        }
    }

    fn cached_artifact(dir: &Path) -> ArtifactRef {
        std::fs::write(dir.join("export.pb"), b"graph").unwrap();
        ArtifactRef::new("http://127.0.0.1:9/export.pb", dir, "export.pb")
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn bootstrap_loads_from_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = cached_artifact(dir.path());
        let expected = artifact.local_path();

        let state = bootstrap(&fetcher(), &artifact, move |path| {
            assert_eq!(path, expected);
            Ok(Fixed("PUFFIN"))
        })
        .await
        .unwrap();

        let img = DynamicImage::new_rgb8(1, 1);
        assert_eq!(state.predictor().predict(&img).unwrap().label, "PUFFIN");
    }

    #[tokio::test]
    async fn load_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = cached_artifact(dir.path());

        let err = bootstrap(&fetcher(), &artifact, |_| -> Result<Fixed, LoadError> {
            Err(LoadError::LabelMismatch {
                expected: 120,
                actual: 3,
            })
        })
        .await
        .err()
        .unwrap();

        assert!(matches!(err, StartupError::Load(LoadError::LabelMismatch { .. })));
    }

    #[tokio::test]
    async fn fetch_failure_skips_loading() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactRef::new("http://127.0.0.1:9/export.pb", dir.path(), "export.pb");

        let err = bootstrap(&fetcher(), &artifact, |_| -> Result<Fixed, LoadError> {
            panic!("loader must not run without an artifact")
        })
        .await
        .err()
        .unwrap();

        assert!(matches!(err, StartupError::Fetch(_)));
    }

    #[test]
    fn clones_share_one_predictor() {
        let state = ModelState::new(Fixed("CROW"));
        let other = state.clone();

        assert!(Arc::ptr_eq(&state.predictor, &other.predictor));
    }
}
