//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use himorganic_core::EmailError;

use crate::store::StoreError;

/// Errors from authentication and account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    AccountExists,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("Current password is required to set a new password")]
    CurrentPasswordRequired,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account not found")]
    AccountNotFound,

    /// bcrypt failed to hash or verify. Never user-induced.
    #[error("password hashing failed")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// JWT signing failed. Never user-induced.
    #[error("token signing failed")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Map the error to an HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidEmail(_) | Self::WeakPassword(_) | Self::CurrentPasswordRequired => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials
            | Self::WrongCurrentPassword
            | Self::InvalidRefreshToken
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::AccountExists => StatusCode::CONFLICT,
            Self::AccountNotFound => StatusCode::NOT_FOUND,
            Self::PasswordHash(_) | Self::TokenSigning(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
