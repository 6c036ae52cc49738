//! In-progress files that become the destination only once complete.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::fs::File;
use tracing::debug;

use super::error::FetchError;
use super::filename::part_path;

/// Process-wide attempt counter; keeps part names unique when two in-flight
/// fetches share a destination.
static NEXT_ATTEMPT: AtomicUsize = AtomicUsize::new(0);

/// A hidden sibling of the destination that receives the body.
#[derive(Debug)]
pub(crate) struct PartFile {
    part: PathBuf,
    destination: PathBuf,
}

impl PartFile {
    /// Creates the part file next to `destination`.
    ///
    /// Fails with [`FetchError::Io`] when the destination directory is
    /// missing, which is how an unprovisioned subsection surfaces.
    pub(crate) async fn create(destination: &Path) -> Result<(Self, File), FetchError> {
        let attempt = NEXT_ATTEMPT.fetch_add(1, Ordering::SeqCst);
        let part = part_path(destination, attempt);
        let file = File::create(&part)
            .await
            .map_err(|e| FetchError::io(part.clone(), e))?;
        Ok((
            Self {
                part,
                destination: destination.to_path_buf(),
            },
            file,
        ))
    }

    /// Path the body is being written to.
    pub(crate) fn path(&self) -> &Path {
        &self.part
    }

    /// Moves the part file over the destination.
    ///
    /// An empty body is not a successful fetch: the part file is removed and
    /// the destination is not touched here.
    pub(crate) async fn commit(self, url: &str, bytes_written: u64) -> Result<u64, FetchError> {
        if bytes_written == 0 {
            self.discard().await;
            return Err(FetchError::empty_body(url));
        }
        if let Err(e) = tokio::fs::rename(&self.part, &self.destination).await {
            let destination = self.destination.clone();
            self.discard().await;
            return Err(FetchError::io(destination, e));
        }
        Ok(bytes_written)
    }

    /// Removes the part file, ignoring errors.
    pub(crate) async fn discard(self) {
        debug!(path = %self.part.display(), "cleaning up partial file");
        let _ = tokio::fs::remove_file(&self.part).await;
    }
}
