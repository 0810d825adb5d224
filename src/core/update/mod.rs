//! Update orchestration
//!
//! [`UpdateCoordinator`] is the caller-facing surface: `start_update` and
//! `force_update` plus stage, percent and current-table channels.

pub mod coordinator;
pub mod summary;

pub use coordinator::UpdateCoordinator;
pub use summary::UpdateSummary;
