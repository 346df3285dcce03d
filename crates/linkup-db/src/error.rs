use linkup_types::pair::PairError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the connection and message stores.
///
/// Everything except `Unavailable` is terminal for the triggering call.
/// `Unavailable` means the store itself failed and the caller may retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("cannot send a connection request to yourself")]
    SelfConnection,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<PairError> for StoreError {
    fn from(e: PairError) -> Self {
        match e {
            PairError::SelfPair => Self::SelfConnection,
            PairError::NonPositive(_) => Self::Validation(e.to_string()),
        }
    }
}
