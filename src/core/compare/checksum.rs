//! SHA-256 digests of archives

use crate::domain::ComparisonError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Incremental digest fed chunk by chunk while an archive downloads
#[derive(Debug, Clone, Default)]
pub struct ArchiveHasher {
    hasher: Sha256,
}

impl ArchiveHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Hex-encoded digest of everything fed so far
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

/// Calculate SHA-256 checksum of raw bytes
///
/// # Examples
///
/// ```
/// use gtfs_sync::core::compare::checksum::calculate_checksum_bytes;
///
/// let checksum = calculate_checksum_bytes(b"abc");
/// assert_eq!(
///     checksum,
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn calculate_checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hex-encoded SHA-256 of a file, read in fixed-size blocks
pub fn sha256_file(path: &Path) -> Result<String, ComparisonError> {
    let read_error = |source| ComparisonError::ReadArchive {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = ArchiveHasher::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(read_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finish())
}
