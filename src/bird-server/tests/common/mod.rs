#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bird_serve::{ModelState, PredictError, Prediction, Predictor};
use bird_server::{AppContext, Assets};
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Response};
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};

pub const BOUNDARY: &str = "------------------------birdboundary";

/// Always answers with the same category.
pub struct FixedLabel(pub &'static str);

impl Predictor for FixedLabel {
    fn predict(&self, _: &DynamicImage) -> Result<Prediction, PredictError> {
        Ok(Prediction {
            label: self.0.to_owned(),
            index: 0,
            probability: 1.0,
        })
    }
}

pub struct Failing;

impl Predictor for Failing {
    fn predict(&self, _: &DynamicImage) -> Result<Prediction, PredictError> {
        Err(PredictError::Inference("out of memory".into()))
    }
}

/// Labels by image width so concurrent responses can be told apart.
pub struct ByWidth {
    pub labels: Vec<&'static str>,
    pub calls: Arc<AtomicUsize>,
}

impl Predictor for ByWidth {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, PredictError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(10));

        let index = image.width() as usize % self.labels.len();
        Ok(Prediction {
            label: self.labels[index].to_owned(),
            index,
            probability: 1.0,
        })
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([120, 80, 40])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

pub fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"bird.png\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        b = BOUNDARY,
        f = field
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(uri: &str, field: &str, data: &[u8]) -> Request<Body> {
    Request::post(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, data)))
        .unwrap()
}

pub fn context<P: Predictor>(predictor: P, assets: &Path) -> Arc<AppContext> {
    Arc::new(AppContext {
        model: ModelState::new(predictor),
        assets: Assets::new(assets),
    })
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
