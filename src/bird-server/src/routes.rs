use std::convert::Infallible;
use std::sync::Arc;

use bird_serve::{handle_classification, ModelState, Timer};
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::assets;
use crate::AppContext;

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("expected a multipart/form-data body")]
    NotMultipart,

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("missing form field '{0}'")]
    MissingField(&'static str),
}

pub async fn handle(
    req: Request<Body>,
    ctx: Arc<AppContext>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let mut response = match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => preflight(),
        (&Method::GET, "/") => assets::index(&ctx.assets).await,
        (&Method::GET, p) if p.starts_with(assets::STATIC_PREFIX) => {
            assets::static_file(&ctx.assets, &p[assets::STATIC_PREFIX.len()..]).await
        }
        (&Method::POST, "/analyze") => analyze(req, &ctx.model).await,
        (_, "/") | (_, "/analyze") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        _ => error_response(StatusCode::NOT_FOUND, "not found"),
    };

    allow_cors(response.headers_mut());
    info!("{} {} {}", method, path, response.status().as_u16());

    Ok(response)
}

async fn analyze(req: Request<Body>, model: &ModelState) -> Response<Body> {
    let mut t = Timer::new_start("Handling request");

    let data = match read_upload(req, UPLOAD_FIELD).await {
        Ok(data) => data,
        Err(err) => {
            warn!("Rejected upload: {}", err);
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let response = match handle_classification(model, data).await {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(err) if err.is_client_error() => {
            warn!("Rejected upload: {}", err);
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err) => {
            warn!("Classification failure: '{}'", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    };

    t.stop();

    response
}

/// Read the bytes of form field `name` from a multipart request.
pub async fn read_upload(req: Request<Body>, name: &'static str) -> Result<Vec<u8>, UploadError> {
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(UploadError::NotMultipart)
        .and_then(|ct| multer::parse_boundary(ct).map_err(|_| UploadError::NotMultipart))?;

    let mut multipart = multer::Multipart::new(req.into_body(), boundary);

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(name) {
            return Ok(field.bytes().await?.to_vec());
        }
    }

    Err(UploadError::MissingField(name))
}

fn preflight() -> Response<Body> {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = StatusCode::NO_CONTENT;
    resp.headers_mut().insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    resp
}

fn allow_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("X-Requested-With, Content-Type"),
    );
}

pub(crate) fn with_content_type(
    status: StatusCode,
    content_type: &'static str,
    body: Body,
) -> Response<Body> {
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_content_type(status, "application/json", Body::from(bytes)),
        Err(err) => with_content_type(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain; charset=utf-8",
            Body::from(format!("Could not render response: {}", err)),
        ),
    }
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &json!({ "error": message }))
}
