use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::auth::{dto::ErrorBody, password::CredentialError, repo::RepoError};

pub const DUPLICATE_EMAIL_MSG: &str = "The user already registered before";
pub const AUTH_FAILURE_MSG: &str = "The user not registered before or wrong password";

/// Errors a register or login request can end with.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{}", DUPLICATE_EMAIL_MSG)]
    DuplicateEmail,
    /// Unknown email, wrong password and corrupt stored hash all land here.
    #[error("{}", AUTH_FAILURE_MSG)]
    AuthenticationFailure,
    #[error("{0}")]
    WeakSecret(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CredentialError> for AuthError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::WeakSecret(msg) => AuthError::WeakSecret(msg),
            CredentialError::CorruptHash(_) => AuthError::AuthenticationFailure,
            CredentialError::Hashing(msg) => AuthError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateEmail => AuthError::DuplicateEmail,
            RepoError::Other(e) => AuthError::Internal(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::Internal(e) => {
                let detail = format!("{e:#}");
                error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            other => (StatusCode::BAD_REQUEST, other.to_string()),
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
