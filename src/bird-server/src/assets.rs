//! Upload page and static files shipped next to the service.

use std::path::{Component, Path, PathBuf};

use hyper::{Body, Response, StatusCode};
use log::debug;

use crate::routes::{error_response, with_content_type};

pub const STATIC_PREFIX: &str = "/static/";

/// Root of the asset tree: `view/index.html` plus everything under `static/`.
#[derive(Clone, Debug)]
pub struct Assets {
    root: PathBuf,
}

impl Assets {
    pub fn new(root: &Path) -> Self {
        Assets {
            root: root.to_path_buf(),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("view").join("index.html")
    }

    /// Map a request path below `/static/` onto the static directory.
    /// Anything that could climb out of it is refused.
    fn static_path(&self, rel: &str) -> Option<PathBuf> {
        let rel = Path::new(rel);

        if rel.as_os_str().is_empty()
            || !rel.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }

        Some(self.root.join("static").join(rel))
    }
}

pub async fn index(assets: &Assets) -> Response<Body> {
    serve_file(&assets.index_path()).await
}

pub async fn static_file(assets: &Assets, rel: &str) -> Response<Body> {
    match assets.static_path(rel) {
        Some(path) => serve_file(&path).await,
        None => error_response(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn serve_file(path: &Path) -> Response<Body> {
    match tokio::fs::read(path).await {
        Ok(bytes) => with_content_type(StatusCode::OK, content_type(path), Body::from(bytes)),
        Err(err) => {
            debug!("{}: {}", path.display(), err);
            error_response(StatusCode::NOT_FOUND, "not found")
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
