//! Archive download

pub mod fetcher;

pub use fetcher::Fetcher;
