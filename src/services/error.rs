use thiserror::Error;

use crate::auth::{AuthError, DenyReason};
use crate::database::models::QuotaKind;
use crate::database::StoreError;
use crate::types::EntityLevel;

/// Failures of the certificate hierarchy and account operations. None are
/// retried; every variant is final for the request that produced it.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("{}", .0.message())]
    Denied(DenyReason),

    #[error("Invalid username or not register.")]
    UnknownUser,

    #[error("Invalid password please try again.")]
    WrongPassword,

    #[error("Parent {0} not found")]
    ParentNotFound(EntityLevel),

    #[error("Parent {0} is disabled or expired")]
    ParentInactive(EntityLevel),

    #[error("Intermediate of type personal cannot issue terminals")]
    PersonalIntermediate,

    #[error("{0} already exists")]
    DuplicateSubject(String),

    #[error("Organization {0} quota exhausted")]
    QuotaExhausted(QuotaKind),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DenyReason> for CoreError {
    fn from(reason: DenyReason) -> Self {
        CoreError::Denied(reason)
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) => CoreError::Unauthenticated,
            other => CoreError::Internal(other.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
