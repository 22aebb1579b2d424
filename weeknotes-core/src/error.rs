//! Top-level error type for the weeknotes library.

use thiserror::Error;

use crate::note::NoteError;
use crate::readings::ReadingsError;
use crate::store::StoreError;
use crate::strava::ApiError;
use crate::token::TokenError;

/// Aggregate error covering every step of a weeknote run.
///
/// The variant identifies which step failed: store, token, fetch,
/// readings, or note writing. Nothing is retried automatically; a
/// fresh invocation is the retry mechanism.
#[derive(Debug, Error)]
pub enum WeeknotesError {
    /// Error from secret storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from token lifecycle operations.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Error from activity retrieval.
    #[error("activity fetch error: {0}")]
    Api(#[from] ApiError),

    /// Error from readings retrieval.
    #[error("readings error: {0}")]
    Readings(#[from] ReadingsError),

    /// Error writing the weeknote.
    #[error("note error: {0}")]
    Note(#[from] NoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_errors_convert_and_name_the_failing_step() {
        let err: WeeknotesError = TokenError::BootstrapRequired.into();
        assert!(err.to_string().starts_with("token error:"));

        let err: WeeknotesError = ApiError::RemoteRejected {
            endpoint: "https://example.com/activities".to_string(),
            status: 500,
        }
        .into();
        assert!(err.to_string().starts_with("activity fetch error:"));

        let err: WeeknotesError = StoreError::BackendError {
            message: "locked".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("store error:"));
    }
}
