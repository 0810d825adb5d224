//! Local file archive source
//!
//! Serves `file://` URLs and plain paths so an archive already on disk can be
//! imported through the same pipeline.

use super::traits::{ArchiveSource, RemoteArchive};
use crate::domain::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// Reads archives from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalArchiveSource;

impl LocalArchiveSource {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a `file://` URL or plain path
    pub fn path_for(url: &str) -> Result<PathBuf, FetchError> {
        if url.starts_with("file:") {
            let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            return parsed.to_file_path().map_err(|_| FetchError::InvalidUrl {
                url: url.to_string(),
                message: "not a local file path".to_string(),
            });
        }
        Ok(PathBuf::from(url))
    }
}

#[async_trait]
impl ArchiveSource for LocalArchiveSource {
    async fn remote_size(&self, url: &str) -> Result<Option<u64>, FetchError> {
        let path = Self::path_for(url)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| FetchError::Io { path, source })?;
        Ok(Some(metadata.len()))
    }

    async fn open(&self, url: &str) -> Result<RemoteArchive, FetchError> {
        let path = Self::path_for(url)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            })?;
        let content_length = file
            .metadata()
            .await
            .map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            })?
            .len();

        let chunks = futures::stream::try_unfold((file, path), |(mut file, path)| async move {
            let mut buffer = vec![0u8; CHUNK_SIZE];
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            buffer.truncate(read);
            Ok(Some((Bytes::from(buffer), (file, path))))
        })
        .boxed();

        Ok(RemoteArchive {
            content_length: Some(content_length),
            chunks,
        })
    }
}
