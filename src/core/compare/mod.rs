//! Change detection
//!
//! - [`checksum`] - SHA-256 digests of archives
//! - [`detector`] - digest or size comparison against the last import

pub mod checksum;
pub mod detector;

pub use checksum::{calculate_checksum_bytes, sha256_file, ArchiveHasher};
pub use detector::ChangeDetector;
