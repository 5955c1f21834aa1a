//! Archive writer
//!
//! Saved items land under the archive root at the path given by
//! [`map_to_path`], optionally gzip-compressed with a `.gz` suffix.
//! Parent directories are created on demand and an existing file is
//! overwritten.

use crate::url::{map_to_path, CanonicalUrl, PathMappingError};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why an item could not be written to the archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Mapping(#[from] PathMappingError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to compress {url}: {source}")]
    Compress {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes fetched bodies into the local archive
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
    gzip: bool,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>, gzip: bool) -> Self {
        Self {
            root: root.into(),
            gzip,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn gzip(&self) -> bool {
        self.gzip
    }

    /// Creates the archive root; failing here is fatal for the run
    pub fn prepare(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// Returns where `url` is stored, including the `.gz` suffix if enabled
    pub fn destination(&self, url: &CanonicalUrl) -> Result<PathBuf, PathMappingError> {
        let relative = map_to_path(url)?;
        let path = self.root.join(relative);

        if !self.gzip {
            return Ok(path);
        }

        let mut name = path.into_os_string();
        name.push(".gz");
        Ok(PathBuf::from(name))
    }

    /// Writes `body` to the archive location of `url`
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - The file that was written
    /// * `Err(ArchiveError)` - Mapping, directory creation, or the write failed
    pub async fn write(&self, url: &CanonicalUrl, body: &[u8]) -> Result<PathBuf, ArchiveError> {
        let path = self.destination(url)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ArchiveError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let result = if self.gzip {
            let compressed = compress(body).map_err(|source| ArchiveError::Compress {
                url: url.to_string(),
                source,
            })?;
            tokio::fs::write(&path, compressed).await
        } else {
            tokio::fs::write(&path, body).await
        };

        result.map_err(|source| ArchiveError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Wrote {} to {}", url, path.display());
        Ok(path)
    }
}

fn compress(body: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
