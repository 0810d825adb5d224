//! Archive download into the staging directory

use crate::adapters::source::ArchiveSource;
use crate::config::{SourceConfig, StagingConfig};
use crate::core::compare::ArchiveHasher;
use crate::core::progress::StageProgress;
use crate::domain::{ArchiveHandle, FetchError};
use crate::logging::{GroupLogger, LogGroup};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Streams the archive to a fixed path inside the staging directory
///
/// Bytes land in `<archive>.part` and are renamed into place only after the
/// whole body arrived, so a failed download never leaves a file that looks
/// complete.
pub struct Fetcher {
    source: Arc<dyn ArchiveSource>,
    staging_dir: PathBuf,
    archive_name: String,
    stall_timeout: Duration,
    logger: GroupLogger,
}

impl Fetcher {
    pub fn new(
        source: Arc<dyn ArchiveSource>,
        staging: &StagingConfig,
        source_config: &SourceConfig,
        logger: GroupLogger,
    ) -> Self {
        Self {
            source,
            staging_dir: PathBuf::from(&staging.dir),
            archive_name: staging.archive_name.clone(),
            stall_timeout: Duration::from_secs(source_config.stall_timeout_seconds),
            logger,
        }
    }

    /// Where a completed download is stored
    pub fn archive_path(&self) -> PathBuf {
        self.staging_dir.join(&self.archive_name)
    }

    fn partial_path(&self) -> PathBuf {
        self.staging_dir.join(format!("{}.part", self.archive_name))
    }

    /// Declared size of the remote archive, when the source reports one
    pub async fn remote_size(&self, url: &str) -> Result<Option<u64>, FetchError> {
        let size = self.source.remote_size(url).await?;
        self.logger.log_with(LogGroup::DownloadSimple, || match size {
            Some(size) => format!("Remote archive declares {size} bytes"),
            None => "Remote archive does not declare a size".to_string(),
        });
        Ok(size)
    }

    /// Download `url`, reporting `bytes_read / content_length` as it goes
    pub async fn fetch(
        &self,
        url: &str,
        progress: &StageProgress,
    ) -> Result<ArchiveHandle, FetchError> {
        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|source| FetchError::Io {
                path: self.staging_dir.clone(),
                source,
            })?;

        let partial = self.partial_path();
        let result = self.download(url, &partial, progress).await;

        let (byte_len, digest) = match result {
            Ok(done) => done,
            Err(e) => {
                if let Err(remove_error) = tokio::fs::remove_file(&partial).await {
                    if remove_error.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            path = %partial.display(),
                            error = %remove_error,
                            "Failed to remove partial archive"
                        );
                    }
                }
                self.logger
                    .log(LogGroup::Error, format!("Download failed: {e}"));
                return Err(e);
            }
        };

        let final_path = self.archive_path();
        tokio::fs::rename(&partial, &final_path)
            .await
            .map_err(|source| FetchError::Io {
                path: final_path.clone(),
                source,
            })?;

        progress.report(100);
        self.logger.log(
            LogGroup::DownloadSimple,
            format!("Downloaded {byte_len} bytes to {}", final_path.display()),
        );
        Ok(ArchiveHandle::new(final_path, byte_len).with_sha256(digest))
    }

    async fn download(
        &self,
        url: &str,
        partial: &Path,
        progress: &StageProgress,
    ) -> Result<(u64, String), FetchError> {
        let io_error = |source| FetchError::Io {
            path: partial.to_path_buf(),
            source,
        };

        self.logger
            .log(LogGroup::DownloadSimple, format!("Downloading {url}"));
        let mut archive = self.source.open(url).await?;
        let content_length = archive.content_length.filter(|len| *len > 0);

        let mut file = tokio::fs::File::create(partial).await.map_err(io_error)?;
        let mut hasher = ArchiveHasher::new();
        let mut bytes_read: u64 = 0;

        loop {
            let next = tokio::time::timeout(self.stall_timeout, archive.chunks.next())
                .await
                .map_err(|_| FetchError::Stalled {
                    url: url.to_string(),
                    seconds: self.stall_timeout.as_secs(),
                })?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;

            file.write_all(&chunk).await.map_err(io_error)?;
            hasher.update(&chunk);
            bytes_read += chunk.len() as u64;

            if let Some(total) = content_length {
                progress.report_fraction(bytes_read, total);
            }
        }

        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;

        if let Some(total) = content_length {
            if bytes_read < total {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    message: format!("body ended after {bytes_read} of {total} bytes"),
                });
            }
        }

        Ok((bytes_read, hasher.finish()))
    }
}
