//! Archive downloads over HTTP against a mock server

use gtfs_sync::adapters::source::{ArchiveSource, HttpArchiveSource, SchemeRouter};
use gtfs_sync::config::{SourceConfig, StagingConfig};
use gtfs_sync::core::compare::calculate_checksum_bytes;
use gtfs_sync::core::fetch::Fetcher;
use gtfs_sync::core::progress::ProgressTracker;
use gtfs_sync::domain::{FetchError, UpdateStage};
use gtfs_sync::logging::GroupLogger;
use std::sync::Arc;
use tempfile::TempDir;

fn fetcher(dir: &TempDir) -> Fetcher {
    let staging = StagingConfig {
        dir: dir.path().join("staging").display().to_string(),
        ..StagingConfig::default()
    };
    let source_config = SourceConfig::default();
    let source: Arc<dyn ArchiveSource> = Arc::new(SchemeRouter::new(&source_config).unwrap());
    Fetcher::new(source, &staging, &source_config, GroupLogger::default())
}

fn body() -> Vec<u8> {
    (0..64 * 1024).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_download_with_content_length() {
    let mut server = mockito::Server::new_async().await;
    let payload = body();
    let mock = server
        .mock("GET", "/google_transit.zip")
        .with_status(200)
        .with_header("content-type", "application/zip")
        .with_body(payload.clone())
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = fetcher(&dir);
    let tracker = ProgressTracker::new();
    let progress = tracker.enter(UpdateStage::Downloading);

    let url = format!("{}/google_transit.zip", server.url());
    let handle = fetcher.fetch(&url, &progress).await.unwrap();

    mock.assert_async().await;
    assert_eq!(handle.byte_len, payload.len() as u64);
    assert_eq!(
        handle.sha256.as_deref(),
        Some(calculate_checksum_bytes(&payload).as_str())
    );
    assert_eq!(std::fs::read(&handle.path).unwrap(), payload);
    assert_eq!(tracker.percent(), 40);
}

#[tokio::test]
async fn test_download_without_content_length() {
    let mut server = mockito::Server::new_async().await;
    let payload = body();
    let chunked = payload.clone();
    server
        .mock("GET", "/feed.zip")
        .with_status(200)
        .with_chunked_body(move |writer| writer.write_all(&chunked))
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = fetcher(&dir);
    let tracker = ProgressTracker::new();
    let progress = tracker.enter(UpdateStage::Downloading);

    let handle = fetcher
        .fetch(&format!("{}/feed.zip", server.url()), &progress)
        .await
        .unwrap();

    assert_eq!(handle.byte_len, payload.len() as u64);
    assert_eq!(tracker.percent(), 40);
}

#[tokio::test]
async fn test_http_error_leaves_no_archive() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing.zip")
        .with_status(404)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = fetcher(&dir);
    let tracker = ProgressTracker::new();
    let progress = tracker.enter(UpdateStage::Downloading);

    let err = fetcher
        .fetch(&format!("{}/missing.zip", server.url()), &progress)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Http { status: 404, .. }));
    assert!(!fetcher.archive_path().exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("staging"))
        .unwrap()
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_failed_download_keeps_previous_archive() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/feed.zip")
        .with_status(503)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = fetcher(&dir);
    std::fs::create_dir_all(dir.path().join("staging")).unwrap();
    std::fs::write(fetcher.archive_path(), b"previous").unwrap();

    let progress = ProgressTracker::new().enter(UpdateStage::Downloading);
    let err = fetcher
        .fetch(&format!("{}/feed.zip", server.url()), &progress)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Http { status: 503, .. }));
    assert_eq!(std::fs::read(fetcher.archive_path()).unwrap(), b"previous");
}

#[tokio::test]
async fn test_remote_size_reports_http_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/feed.zip")
        .with_status(500)
        .create_async()
        .await;

    let source = HttpArchiveSource::new(&SourceConfig::default()).unwrap();
    let err = source
        .remote_size(&format!("{}/feed.zip", server.url()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let source = HttpArchiveSource::new(&SourceConfig {
        connect_timeout_seconds: 1,
        ..SourceConfig::default()
    })
    .unwrap();

    let err = source.open("http://127.0.0.1:9/feed.zip").await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
}
