use thiserror::Error;

use petalerp_core::DomainError;

/// Failures of the in-process store itself. Fatal: the transaction is aborted
/// and the error surfaces unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("failed to serialize event payload: {0}")]
    Serialize(String),
}

#[derive(Debug, Error)]
pub enum BackOfficeError {
    /// Expected business condition; nothing was committed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Publication failed after the commit (at-least-once; a retry may duplicate).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl BackOfficeError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            BackOfficeError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub type BackOfficeResult<T> = Result<T, BackOfficeError>;
