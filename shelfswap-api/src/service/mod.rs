//! The marketplace operations. Each service owns its collaborators behind
//! `Arc`s handed in at startup and knows nothing about HTTP.

use shelfswap_common::{
    model::{
        ModelValidationError,
        auth::{AuthTokenHashError, PasswordError},
    },
    search::InvalidRadiusError,
};
use shelfswap_db::DbError;
use thiserror::Error;

pub mod accounts;
pub mod listings;
pub mod notifications;
pub mod notifier;
pub mod watchlist;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error(transparent)]
    Radius(#[from] InvalidRadiusError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Textbook {given} does not belong to post {post}, which sells textbook {actual}")]
    TextbookMismatch { post: u64, given: u64, actual: u64 },
    #[error("{kind} with id {id} was not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("The referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error("Not allowed to {0}")]
    Unauthorized(&'static str),
    #[error("Email or password is incorrect")]
    InvalidCredentials,
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("A {0} with the same key already exists")]
    Conflict(&'static str),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    Store(DbError),
}

impl ServiceError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Duplicate(what) => Self::Conflict(what),
            DbError::MissingReference(what) => Self::MissingReference(what),
            other => Self::Store(other),
        }
    }
}
