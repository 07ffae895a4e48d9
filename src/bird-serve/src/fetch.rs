//! Download-once cache for the model artifact.
//!
//! Presence of the destination file is the only freshness check. Each
//! download streams into its own temporary file next to the destination and
//! is renamed into place once the whole response has been written. An
//! interrupted download never leaves anything at the destination, and two
//! processes racing on the same destination both succeed with the last
//! rename winning.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config;
use crate::timer::Timer;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("body of {url} ended after {received} of {expected} bytes")]
    Truncated {
        url: String,
        expected: u64,
        received: u64,
    },

    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; nothing was requested
    AlreadyPresent,

    /// The artifact was downloaded and moved into place
    Downloaded { bytes: u64 },
}

pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Fetcher { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Fetcher { client }
    }

    /// Make sure `dest` exists, downloading `url` into it if it does not.
    pub async fn ensure(&self, url: &str, dest: &Path) -> Result<FetchOutcome, FetchError> {
        if fs::metadata(dest).await.is_ok() {
            info!("Artifact {} already present", dest.display());
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .await
            .map_err(|source| FetchError::Io {
                path: parent.clone(),
                source,
            })?;

        // Dropping the temporary file deletes it, so every early return cleans up.
        let partial = partial_file(&parent, dest).map_err(|source| FetchError::Io {
            path: parent.clone(),
            source,
        })?;
        let mut t = Timer::new_start(&format!("Fetching artifact from {}", url));

        let bytes = self.download(url, &partial).await?;

        if let Err(err) = partial.persist(dest) {
            if fs::metadata(dest).await.is_ok() {
                t.stop();
                info!("Artifact {} was stored concurrently", dest.display());
                return Ok(FetchOutcome::AlreadyPresent);
            }
            return Err(FetchError::Io {
                path: dest.to_path_buf(),
                source: err.error,
            });
        }

        t.stop();
        info!("Stored {} bytes at {}", bytes, dest.display());

        Ok(FetchOutcome::Downloaded { bytes })
    }

    async fn download(&self, url: &str, partial: &NamedTempFile) -> Result<u64, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_owned(),
            source,
        };
        let io_error = |source| FetchError::Io {
            path: partial.path().to_path_buf(),
            source,
        };

        let mut resp = self.client.get(url).send().await.map_err(request_error)?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: resp.status(),
            });
        }

        let expected = resp.content_length();
        let handle = partial.as_file().try_clone().map_err(io_error)?;
        let mut file = fs::File::from_std(handle);
        let mut received: u64 = 0;

        while let Some(chunk) = resp.chunk().await.map_err(request_error)? {
            file.write_all(&chunk).await.map_err(io_error)?;
            received += chunk.len() as u64;
        }

        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;

        match expected {
            Some(expected) if expected != received => Err(FetchError::Truncated {
                url: url.to_owned(),
                expected,
                received,
            }),
            _ => Ok(received),
        }
    }
}

/// Fetch with a default client. See [`Fetcher::ensure`].
pub async fn ensure_artifact(url: &str, dest: &Path) -> Result<FetchOutcome, FetchError> {
    Fetcher::new(config::default_fetch_timeout())?
        .ensure(url, dest)
        .await
}

/// Uniquely named `.<file>.<random>.part` in `dir`, removed when dropped.
fn partial_file(dir: &Path, dest: &Path) -> std::io::Result<NamedTempFile> {
    let mut prefix = OsString::from(".");
    prefix.push(dest.file_name().unwrap_or_default());
    prefix.push(".");

    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".part")
        .tempfile_in(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve `response` verbatim to every connection, counting requests.
    async fn raw_server(response: Vec<u8>) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let (mut sock, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut req = Vec::new();
                let mut buf = [0u8; 1024];
                while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => req.extend_from_slice(&buf[..n]),
                    }
                }

                let _ = sock.write_all(&response).await;
                let _ = sock.shutdown().await;
            }
        });

        (addr, hits)
    }

    fn ok_response(body: &[u8]) -> Vec<u8> {
        let mut resp = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        resp.extend_from_slice(body);
        resp
    }

    /// Stream `body` in 1 KiB chunks with `delay` between them, one task per connection.
    async fn slow_server(body: Vec<u8>, delay: Duration) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = Arc::new(body);

        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = sock.read(&mut buf).await;

                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = sock.write_all(head.as_bytes()).await;
                    for chunk in body.chunks(1024) {
                        if sock.write_all(chunk).await.is_err() {
                            return;
                        }
                        tokio::time::sleep(delay).await;
                    }
                    let _ = sock.shutdown().await;
                });
            }
        });

        addr
    }

    /// Everything in `dir` besides the artifact itself.
    fn leftovers(dir: &Path) -> Vec<OsString> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name != "export.pb")
            .collect()
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn downloads_once_then_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.pb");
        let (addr, hits) = raw_server(ok_response(b"graph-bytes")).await;
        let url = format!("http://{}/export.pb", addr);

        let first = fetcher().ensure(&url, &dest).await.unwrap();
        let second = fetcher().ensure(&url, &dest).await.unwrap();

        assert_eq!(first, FetchOutcome::Downloaded { bytes: 11 });
        assert_eq!(second, FetchOutcome::AlreadyPresent);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"graph-bytes");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn existing_file_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.pb");
        std::fs::write(&dest, b"cached").unwrap();

        // Nothing listens on the discard port; any request would fail.
        let outcome = fetcher()
            .ensure("http://127.0.0.1:9/export.pb", &dest)
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
        assert_eq!(std::fs::read(&dest).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn error_status_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.pb");
        let (addr, _) = raw_server(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
        )
        .await;

        let err = fetcher()
            .ensure(&format!("http://{}/missing", addr), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 404));
        assert!(!dest.exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn interrupted_body_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.pb");
        let (addr, _) = raw_server(
            b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\nonly-a-prefix"
                .to_vec(),
        )
        .await;

        let result = fetcher()
            .ensure(&format!("http://{}/export.pb", addr), &dest)
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.pb");

        let err = fetcher()
            .ensure("http://127.0.0.1:9/export.pb", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Request { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("models").join("export.pb");
        let (addr, _) = raw_server(ok_response(b"abc")).await;

        ensure_artifact(&format!("http://{}/export.pb", addr), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn racing_downloads_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.pb");
        let body: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let addr = slow_server(body.clone(), Duration::from_millis(15)).await;
        let url = format!("http://{}/export.pb", addr);

        let (a, b) = (fetcher(), fetcher());

        let first = a.ensure(&url, &dest);
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            b.ensure(&url, &dest).await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok(), "{:?}", first);
        assert!(second.is_ok(), "{:?}", second);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn partial_files_are_unique_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.pb");

        let a = partial_file(dir.path(), &dest).unwrap();
        let b = partial_file(dir.path(), &dest).unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().parent(), Some(dir.path()));
        let name = a.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".export.pb.") && name.ends_with(".part"));
    }
}
