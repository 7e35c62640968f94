use thiserror::Error;

use crate::database::DatabaseError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Session secret not configured")]
    MissingSecret,

    #[error("{0}")]
    Validation(String),

    #[error("Registration is disabled")]
    RegistrationDisabled,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Unknown OAuth provider: {0}")]
    UnknownProvider(String),

    #[error("OAuth state is missing, expired or already used")]
    InvalidState,

    #[error("This email is already associated with another sign-in method")]
    AccountNotLinked,

    #[error("OAuth provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
