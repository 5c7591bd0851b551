use crate::db::error::DbError;
use linkbio_core::{LinkError, UsernameIssue};
use thiserror::Error;

/// ServiceError represents errors that can occur in the service layer of the application.
/// It covers missing records, rejected input, rule violations and authentication failures,
/// and wraps the lower-level database and hashing errors.
///
/// The `Display` text of the input-related variants is safe to show to end users.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Username is already taken: {0}")]
    UsernameTaken(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error(transparent)]
    PasswordHash(#[from] password_hash::Error),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<UsernameIssue> for ServiceError {
    fn from(issue: UsernameIssue) -> Self {
        ServiceError::Validation {
            field: "username",
            message: issue.to_string(),
        }
    }
}

impl From<LinkError> for ServiceError {
    fn from(e: LinkError) -> Self {
        let field = match e {
            LinkError::EmptyTitle | LinkError::TitleTooLong { .. } => "title",
            LinkError::EmptyUrl | LinkError::InvalidUrl(_) => "url",
            LinkError::PositionOutOfRange { .. } => "position",
        };
        ServiceError::Validation {
            field,
            message: e.to_string(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
