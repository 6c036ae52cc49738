//! `file://` retrieval: copies a local file into the corpus.
//!
//! Only regular files are accepted. A URL naming a directory fails like any
//! other bad source; list the files individually to integrate a local archive.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

use super::Fetcher;
use super::error::FetchError;
use super::part::PartFile;

/// Fetcher for `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    #[instrument(skip(self, destination), fields(url = %url))]
    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if parsed.scheme() != "file" {
            return Err(FetchError::unsupported_scheme(url, parsed.scheme()));
        }
        let source_path = parsed
            .to_file_path()
            .map_err(|()| FetchError::invalid_url(url))?;

        let metadata = tokio::fs::metadata(&source_path)
            .await
            .map_err(|e| FetchError::io(source_path.clone(), e))?;
        if !metadata.is_file() {
            return Err(FetchError::not_a_file(source_path));
        }
        let mut source = File::open(&source_path)
            .await
            .map_err(|e| FetchError::io(source_path.clone(), e))?;
        let (part, mut file) = PartFile::create(destination).await?;

        let copied = match tokio::io::copy(&mut source, &mut file).await {
            Ok(bytes) => file.flush().await.map(|()| bytes),
            Err(e) => Err(e),
        };
        drop(file);
        match copied {
            Ok(bytes) => {
                debug!(source = %source_path.display(), bytes, "copied local file");
                part.commit(url, bytes).await
            }
            Err(e) => {
                part.discard().await;
                Err(FetchError::io(source_path, e))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_fetch_copies_content() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.txt");
        std::fs::write(&source, b"local bytes").unwrap();
        let out = temp.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let url = Url::from_file_path(&source).unwrap();

        let bytes = FileFetcher
            .fetch_to(url.as_str(), &out.join("source.txt"))
            .await
            .unwrap();

        assert_eq!(bytes, 11);
        assert_eq!(std::fs::read(out.join("source.txt")).unwrap(), b"local bytes");
    }

    #[tokio::test]
    async fn test_file_fetch_missing_source_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let url = Url::from_file_path(temp.path().join("absent.txt")).unwrap();

        let result = FileFetcher
            .fetch_to(url.as_str(), &temp.path().join("copy.txt"))
            .await;

        assert!(matches!(result, Err(FetchError::Io { .. })), "got {result:?}");
        assert!(!temp.path().join("copy.txt").exists());
    }

    #[tokio::test]
    async fn test_file_fetch_empty_source_is_failure() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("empty.txt");
        std::fs::write(&source, b"").unwrap();
        let out = temp.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let url = Url::from_file_path(&source).unwrap();

        let result = FileFetcher.fetch_to(url.as_str(), &out.join("empty.txt")).await;

        assert!(matches!(result, Err(FetchError::EmptyBody { .. })), "got {result:?}");
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_file_fetch_directory_source_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        std::fs::create_dir(&archive).unwrap();
        std::fs::write(archive.join("inside.txt"), b"data").unwrap();
        let out = temp.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let url = Url::from_directory_path(&archive).unwrap();

        let result = FileFetcher.fetch_to(url.as_str(), &out.join("archive")).await;

        match result {
            Err(FetchError::NotAFile { path }) => assert_eq!(path, archive),
            other => panic!("Expected NotAFile, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_file_fetch_rejects_other_schemes() {
        let temp = TempDir::new().unwrap();
        let result = FileFetcher
            .fetch_to("https://example.com/a", &temp.path().join("a"))
            .await;
        assert!(matches!(result, Err(FetchError::UnsupportedScheme { .. })));
    }
}
