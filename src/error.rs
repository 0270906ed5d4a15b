use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalStoreErrorCode {
    InvalidArgument,
    FailedPrecondition,
    Persistence,
    DataCorruption,
    Internal,
}

impl LocalStoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalStoreErrorCode::InvalidArgument => "localstore/invalid-argument",
            LocalStoreErrorCode::FailedPrecondition => "localstore/failed-precondition",
            LocalStoreErrorCode::Persistence => "localstore/persistence",
            LocalStoreErrorCode::DataCorruption => "localstore/data-corruption",
            LocalStoreErrorCode::Internal => "localstore/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocalStoreError {
    pub code: LocalStoreErrorCode,
    message: String,
}

impl LocalStoreError {
    pub fn new(code: LocalStoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for LocalStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for LocalStoreError {}

pub type StoreResult<T> = Result<T, LocalStoreError>;

pub fn invalid_argument(message: impl Into<String>) -> LocalStoreError {
    LocalStoreError::new(LocalStoreErrorCode::InvalidArgument, message)
}

/// Raised when a caller violates an ordering contract, e.g. acknowledging a
/// batch that is not at the head of the queue.
pub fn failed_precondition(message: impl Into<String>) -> LocalStoreError {
    LocalStoreError::new(LocalStoreErrorCode::FailedPrecondition, message)
}

/// Raised when the storage back-end fails; the enclosing transaction must not
/// leave partial state visible.
pub fn persistence_error(message: impl Into<String>) -> LocalStoreError {
    LocalStoreError::new(LocalStoreErrorCode::Persistence, message)
}

/// Raised when persisted state fails an invariant on read.
pub fn data_corruption(message: impl Into<String>) -> LocalStoreError {
    LocalStoreError::new(LocalStoreErrorCode::DataCorruption, message)
}

pub fn internal_error(message: impl Into<String>) -> LocalStoreError {
    LocalStoreError::new(LocalStoreErrorCode::Internal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_code_and_message() {
        let err = failed_precondition("batch 7 is not at the head of the queue");
        assert_eq!(err.code_str(), "localstore/failed-precondition");
        assert!(err.to_string().contains("batch 7"));
    }
}
