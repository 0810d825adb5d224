//! Result type alias for gtfs-sync
//!
//! Uses [`SyncError`] as the error type for configuration, logging and CLI
//! level operations. Pipeline stages return their own stage errors.

use super::errors::SyncError;

/// Result type alias for gtfs-sync operations
///
/// # Examples
///
/// ```
/// use gtfs_sync::domain::result::Result;
/// use gtfs_sync::domain::errors::SyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(SyncError::Configuration("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(SyncError::Other("test error".to_string()));
        assert!(result.is_err());
    }
}
