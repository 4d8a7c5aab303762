//! Image byte downloads.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

/// Downloader settings.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Upper bound for a whole download, body included.
    pub timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
        }
    }
}

/// Boxed future returned by [`ImageFetcher`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>>;

/// Fetches the raw bytes behind an image URL.
///
/// Every failure mode yields `None`.
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

/// HTTP image downloader.
#[derive(Clone)]
pub struct AssetDownloader {
    http: reqwest::Client,
}

impl AssetDownloader {
    pub fn new(config: &DownloaderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http })
    }

    /// Downloads `url`. Blank URLs, transport errors and non-2xx statuses
    /// all come back as `None`.
    pub async fn download(&self, url: &str) -> Option<Vec<u8>> {
        if url.trim().is_empty() {
            debug!("blank image url, nothing to download");
            return None;
        }

        let resp = match self.http.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(url, error = %e, "image download failed");
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "image unavailable");
            return None;
        }

        match resp.bytes().await {
            Ok(body) => Some(body.to_vec()),
            Err(e) => {
                debug!(url, error = %e, "failed to read image body");
                None
            }
        }
    }
}

impl ImageFetcher for AssetDownloader {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(self.download(url))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `(path, status, body)` routes; unknown paths get a 404.
    pub(crate) async fn mock_images(
        routes: Vec<(&'static str, u16, Vec<u8>)>,
    ) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_srv = Arc::clone(&seen);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let line = request.lines().next().unwrap_or_default().to_string();
                seen_srv.lock().unwrap().push(line.clone());

                let path = line.split_whitespace().nth(1).unwrap_or_default();
                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, Vec::new()));

                let head = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&body).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, seen)
    }

    fn downloader() -> AssetDownloader {
        AssetDownloader::new(&DownloaderConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn download_returns_body() {
        let (url, _seen) = mock_images(vec![("/a.png", 200, vec![7u8; 2000])]).await;

        let bytes = downloader().download(&format!("{url}/a.png")).await.unwrap();
        assert_eq!(bytes.len(), 2000);
    }

    #[tokio::test]
    async fn non_success_is_unavailable() {
        let (url, _seen) = mock_images(vec![("/gone.png", 410, b"gone".to_vec())]).await;

        let dl = downloader();
        assert!(dl.download(&format!("{url}/gone.png")).await.is_none());
        assert!(dl.download(&format!("{url}/missing.png")).await.is_none());
    }

    #[tokio::test]
    async fn blank_url_issues_no_request() {
        let (_url, seen) = mock_images(vec![]).await;

        let dl = downloader();
        assert!(dl.download("").await.is_none());
        assert!(dl.download("   ").await.is_none());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connection_error_is_unavailable() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = downloader()
            .download(&format!("http://127.0.0.1:{port}/x.png"))
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn stalled_server_times_out() {
        // Accepts connections but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                open.push(stream);
            }
        });

        let dl = AssetDownloader::new(&DownloaderConfig {
            timeout: Duration::from_millis(200),
        })
        .unwrap();
        let started = std::time::Instant::now();
        let result = dl.download(&format!("http://127.0.0.1:{port}/slow.png")).await;

        assert!(result.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn default_timeout() {
        assert_eq!(DownloaderConfig::default().timeout, Duration::from_secs(20));
    }
}
