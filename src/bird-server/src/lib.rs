//! HTTP front end for the bird classifier.
//!
//! Startup is strictly ordered: the model artifact is fetched and loaded by
//! [`bird_serve::bootstrap`] before any socket is bound, so a client can never
//! reach a server without a model.

pub mod assets;
pub mod routes;

use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::Arc;

use bird_serve::{bootstrap, ArtifactRef, Fetcher, LoadError, ModelState, Predictor, StartupError};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use log::info;
use thiserror::Error;

pub use assets::Assets;

/// Everything a request handler may read. Never mutated after construction.
pub struct AppContext {
    pub model: ModelState,
    pub assets: Assets,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] hyper::Error),
}

pub fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })
}

/// Serve requests on `listener` until `shutdown` resolves.
pub async fn serve<S>(
    listener: TcpListener,
    ctx: Arc<AppContext>,
    shutdown: S,
) -> Result<(), ServerError>
where
    S: Future<Output = ()>,
{
    // A `MakeService` that produces a `Service` to handle each connection.
    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let ctx = Arc::clone(&ctx);

        let service = service_fn(move |req| routes::handle(req, Arc::clone(&ctx)));

        async move { Ok::<_, Infallible>(service) }
    });

    Server::from_tcp(listener)?
        .serve(make_service)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Load the model, then bind `addr` and serve until `shutdown` resolves.
pub async fn start<P, F, S>(
    addr: SocketAddr,
    fetcher: &Fetcher,
    artifact: &ArtifactRef,
    assets: Assets,
    load: F,
    shutdown: S,
) -> Result<(), ServerError>
where
    P: Predictor,
    F: FnOnce(&Path) -> Result<P, LoadError> + Send + 'static,
    S: Future<Output = ()>,
{
    let model = bootstrap(fetcher, artifact, load).await?;

    let listener = bind(addr)?;
    info!("Listening on http://{}", addr);

    serve(listener, Arc::new(AppContext { model, assets }), shutdown).await
}
