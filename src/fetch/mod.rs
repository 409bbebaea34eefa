// src/fetch/mod.rs
use futures_util::StreamExt;
use reqwest::Client;
use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches a remote audio file to an exact local path.
pub trait Downloader {
    /// Download `url` into `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> impl Future<Output = Result<u64>> + Send;
}

/// Sibling of `dest` the body is streamed into before it is renamed into place.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// HTTP(S) downloader streaming the body to `<dest>.part`, renamed on completion.
#[derive(Clone, Debug)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(FetchError::HttpClient)?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn write_body(&self, url: &str, part: &Path, dest: &Path) -> Result<u64> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Download {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::DownloadStatus {
                url: url.to_string(),
                status,
            });
        }

        let mut file = fs::File::create(part)
            .await
            .map_err(|e| FetchError::io(part, e))?;
        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FetchError::Download {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(part, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| FetchError::io(part, e))?;
        drop(file);
        fs::rename(part, dest)
            .await
            .map_err(|e| FetchError::io(part, e))?;
        Ok(written)
    }
}

impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!(url, dest = %dest.display(), "GET");
        let part = partial_path(dest);
        match self.write_body(url, &part, dest).await {
            Ok(bytes) => {
                info!(url, dest = %dest.display(), bytes, "downloaded");
                Ok(bytes)
            }
            Err(err) => {
                // never leave a truncated original behind for the next run to convert
                if let Err(e) = fs::remove_file(&part).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(part = %part.display(), error = %e, "could not remove partial download");
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const BODY: &[u8] = b"ID3 fake mp3 payload";

    fn local_downloader() -> HttpDownloader {
        HttpDownloader::with_client(Client::builder().no_proxy().build().unwrap())
    }

    /// Serves `/ok.mp3` with `BODY`, cuts `/truncated.mp3` short after a
    /// few bytes, everything else gets 404.
    async fn serve() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut sock, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = sock.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }
                    let request = String::from_utf8_lossy(&buf);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body, declared): (&str, &[u8], usize) = match path.as_str() {
                        "/ok.mp3" => ("200 OK", BODY, BODY.len()),
                        "/truncated.mp3" => ("200 OK", &b"partialbytes"[..], 100_000),
                        _ => ("404 Not Found", &b"missing"[..], 7),
                    };
                    let head = format!(
                        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status, declared
                    );
                    let _ = sock.write_all(head.as_bytes()).await;
                    let _ = sock.write_all(body).await;
                    let _ = sock.shutdown().await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn downloads_body_to_exact_path() {
        let base = serve().await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("7.mp3");

        let dl = local_downloader();
        let bytes = dl.download(&format!("{}/ok.mp3", base), &dest).await.unwrap();

        assert_eq!(bytes, BODY.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), BODY);
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn body_cut_short_removes_partial_file() {
        let base = serve().await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("10.wav");

        let dl = local_downloader();
        let err = dl
            .download(&format!("{}/truncated.mp3", base), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Download { .. }));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
        assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("out/S/7.wav")),
            PathBuf::from("out/S/7.wav.part")
        );
        assert_eq!(partial_path(Path::new("out/S/7")), PathBuf::from("out/S/7.part"));
    }

    #[tokio::test]
    async fn http_error_status_is_reported_and_leaves_no_file() {
        let base = serve().await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("8.mp3");

        let dl = local_downloader();
        let err = dl
            .download(&format!("{}/gone.mp3", base), &dest)
            .await
            .unwrap_err();

        match err {
            FetchError::DownloadStatus { status, .. } => assert_eq!(status.as_u16(), 404),
            other => panic!("expected DownloadStatus, got {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_download_error() {
        // bind then drop to get a port nobody listens on
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("9.mp3");

        let dl = local_downloader();
        let err = dl
            .download(&format!("http://127.0.0.1:{}/ok.mp3", port), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Download { .. }));
        assert!(!dest.exists());
    }
}
