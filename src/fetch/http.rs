//! HTTP(S) retrieval with streaming writes.
//!
//! The client is built once per run and reused for every URL so connections
//! to the same host are pooled. Each request is a single attempt: no retry,
//! no resume, no Range requests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::Fetcher;
use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use super::part::PartFile;
use crate::user_agent;

/// HTTP fetcher backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeouts (30s connect, 5min read).
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a fetcher with explicit timeout values in seconds.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_fetch_user_agent())
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, destination), fields(url = %url))]
    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        debug!("starting fetch");
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let (part, mut file) = PartFile::create(destination).await?;

        let response = match self.send(url).await {
            Ok(response) => response,
            Err(e) => {
                drop(file);
                part.discard().await;
                return Err(e);
            }
        };

        let streamed = stream_to_file(&mut file, response, url, part.path()).await;
        drop(file);
        match streamed {
            Ok(bytes) => part.commit(url, bytes).await,
            Err(e) => {
                part.discard().await;
                Err(e)
            }
        }
    }
}

/// Streams response body to the part file at `part_path`, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    part_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(part_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(part_path, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_http_fetch_success_writes_destination() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/f1.txt"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"file one"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let dest = temp_dir.path().join("f1.txt");
        let url = format!("{}/f1.txt", mock_server.uri());

        let bytes = fetcher.fetch_to(&url, &dest).await.unwrap();

        assert_eq!(bytes, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"file one");
        assert_eq!(entries(temp_dir.path()), vec!["f1.txt"]);
    }

    #[tokio::test]
    async fn test_http_fetch_404_leaves_no_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404).set_body_bytes(b"not found page"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/missing.pdf", mock_server.uri());
        let result = fetcher
            .fetch_to(&url, &temp_dir.path().join("missing.pdf"))
            .await;

        match result {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
        assert!(entries(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_http_fetch_empty_body_is_failure() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/empty", mock_server.uri());
        let result = fetcher.fetch_to(&url, &temp_dir.path().join("empty")).await;

        assert!(matches!(result, Err(FetchError::EmptyBody { .. })), "got {result:?}");
        assert!(entries(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_http_fetch_failure_keeps_existing_destination() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("file.bin");
        std::fs::write(&dest, b"from an earlier run").unwrap();

        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/file.bin", mock_server.uri());
        assert!(fetcher.fetch_to(&url, &dest).await.is_err());

        assert_eq!(std::fs::read(&dest).unwrap(), b"from an earlier run");
    }

    #[tokio::test]
    async fn test_http_fetch_read_timeout_cleans_up() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::with_timeouts(1, 1).unwrap();
        let url = format!("{}/slow", mock_server.uri());
        let result = fetcher.fetch_to(&url, &temp_dir.path().join("slow")).await;

        assert!(matches!(result, Err(FetchError::Timeout { .. })), "got {result:?}");
        assert!(entries(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_http_fetch_invalid_url_sends_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new().unwrap();

        let result = fetcher
            .fetch_to("not a url", &temp_dir.path().join("x"))
            .await;

        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
        assert!(entries(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_http_fetch_into_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new().unwrap();

        let result = fetcher
            .fetch_to(
                "http://127.0.0.1:9/never.txt",
                &temp_dir.path().join("absent").join("never.txt"),
            )
            .await;

        // IO errors name the file being written, not the destination
        match result {
            Err(FetchError::Io { path, .. }) => {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                assert!(name.starts_with(".never.txt.") && name.ends_with(".part"), "{name}");
            }
            other => panic!("Expected Io error, got {other:?}"),
        }
    }
}
