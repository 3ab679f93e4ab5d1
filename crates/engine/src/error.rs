//! The module contains the errors the engine can return.
//!
//! The taxonomy mirrors what callers need to do about a failure:
//!
//! - [`Validation`] the input itself is malformed; fix it and retry.
//! - [`Conflict`] the operation is legal but lost against current state
//!   (duplicate unresolved transfer, illegal status transition); retrying
//!   unchanged will fail again.
//! - [`Forbidden`] the acting member is not the required party.
//! - [`NotFound`] unknown id, or an id outside the stated group.
//!
//! [`Validation`]: EngineError::Validation
//! [`Conflict`]: EngineError::Conflict
//! [`Forbidden`]: EngineError::Forbidden
//! [`NotFound`]: EngineError::NotFound
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
