//! Resolution of stored photo references into uploadable sources.

use crate::telegram::PhotoSource;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("photo reference escapes the upload directory: {0}")]
    OutsideRoot(String),

    #[error("failed to read photo {reference}: {source}")]
    Io {
        reference: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns a stored photo reference into something the gateway can send.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// `Ok(None)` means there is nothing to attach and the post goes out as text.
    async fn resolve(&self, reference: &str) -> Result<Option<PhotoSource>, MediaError>;
}

/// Reads uploads from a local directory. `http(s)` references pass through.
#[derive(Debug, Clone)]
pub struct LocalMediaResolver {
    root: PathBuf,
}

impl LocalMediaResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local_path(&self, reference: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(reference);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(MediaError::OutsideRoot(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaResolver for LocalMediaResolver {
    async fn resolve(&self, reference: &str) -> Result<Option<PhotoSource>, MediaError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }
        if reference.starts_with("https://") || reference.starts_with("http://") {
            return Ok(Some(PhotoSource::Url(reference.to_string())));
        }

        let path = self.local_path(reference)?;
        let data = tokio::fs::read(&path).await.map_err(|source| MediaError::Io {
            reference: reference.to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo.jpg")
            .to_string();
        Ok(Some(PhotoSource::Bytes {
            data: bytes::Bytes::from(data),
            file_name,
        }))
    }
}
