//! Archive source adapters
//!
//! [`SchemeRouter`] picks the HTTP or local source per URL, so the source can
//! change between runs without rebuilding the coordinator.

pub mod http;
pub mod local;
pub mod traits;

pub use http::HttpArchiveSource;
pub use local::LocalArchiveSource;
pub use traits::{ArchiveSource, ChunkStream, RemoteArchive};

use crate::config::SourceConfig;
use crate::domain::FetchError;
use async_trait::async_trait;

/// Which adapter serves a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Local,
}

/// Classify a URL by scheme; plain paths are local
pub fn source_kind(url: &str) -> Result<SourceKind, FetchError> {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(SourceKind::Http),
            "file" => Ok(SourceKind::Local),
            // drive letters such as C:\feeds\feed.zip
            scheme if scheme.len() == 1 => Ok(SourceKind::Local),
            other => Err(FetchError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme '{other}'"),
            }),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(SourceKind::Local),
        Err(e) => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Dispatches to the HTTP or local source by URL scheme
#[derive(Debug, Clone)]
pub struct SchemeRouter {
    http: HttpArchiveSource,
    local: LocalArchiveSource,
}

impl SchemeRouter {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpArchiveSource::new(config)?,
            local: LocalArchiveSource::new(),
        })
    }

    fn route(&self, url: &str) -> Result<&dyn ArchiveSource, FetchError> {
        Ok(match source_kind(url)? {
            SourceKind::Http => &self.http,
            SourceKind::Local => &self.local,
        })
    }
}

#[async_trait]
impl ArchiveSource for SchemeRouter {
    async fn remote_size(&self, url: &str) -> Result<Option<u64>, FetchError> {
        self.route(url)?.remote_size(url).await
    }

    async fn open(&self, url: &str) -> Result<RemoteArchive, FetchError> {
        self.route(url)?.open(url).await
    }
}
