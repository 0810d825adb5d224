//! Archive source boundary

use crate::domain::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Body chunks of an archive being read
pub type ChunkStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// An opened archive body
pub struct RemoteArchive {
    /// Declared size, when the source reports one
    pub content_length: Option<u64>,

    /// Body chunks in order
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for RemoteArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteArchive")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Something that can serve the published archive
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Declared archive size without reading the body
    ///
    /// Returns `Ok(None)` when the source does not report a size.
    async fn remote_size(&self, url: &str) -> Result<Option<u64>, FetchError>;

    /// Start reading the archive body
    async fn open(&self, url: &str) -> Result<RemoteArchive, FetchError>;
}
