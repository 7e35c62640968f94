use serde::Deserialize;

use super::password::{hash_password, verify_password};
use super::validation::{validate_email_format, validate_name, validate_password};
use super::{AuthError, Role};
use crate::database::models::user::normalize_email;
use crate::database::models::{NewUser, User};
use crate::database::{AuthAdapter, DatabaseError};

pub const PROVIDER_ID: &str = "credentials";

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Check an email/password pair. Unknown users, OAuth-only users and wrong
/// passwords all come back as `Ok(None)`.
pub async fn authorize(
    adapter: &dyn AuthAdapter,
    credentials: &Credentials,
) -> Result<Option<User>, AuthError> {
    let email = normalize_email(&credentials.email);
    if email.is_empty() || credentials.password.is_empty() {
        return Ok(None);
    }

    let Some(user) = adapter.get_user_by_email(&email).await? else {
        tracing::debug!("Credentials sign-in for unknown email");
        return Ok(None);
    };

    let Some(hash) = user.password_hash.as_deref() else {
        tracing::debug!(user_id = %user.id, "Credentials sign-in for user without password");
        return Ok(None);
    };

    if verify_password(&credentials.password, hash).await? {
        Ok(Some(user))
    } else {
        tracing::debug!(user_id = %user.id, "Credentials sign-in with wrong password");
        Ok(None)
    }
}

/// Create a credentials user. New users always start as USER.
pub async fn register(
    adapter: &dyn AuthAdapter,
    registration: Registration,
    bcrypt_cost: u32,
) -> Result<User, AuthError> {
    let name = validate_name(&registration.name).map_err(AuthError::Validation)?;
    let email = validate_email_format(&registration.email).map_err(AuthError::Validation)?;
    validate_password(&registration.password).map_err(AuthError::Validation)?;

    if adapter.get_user_by_email(&email).await?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    let password_hash = hash_password(&registration.password, bcrypt_cost).await?;
    let user = adapter
        .create_user(NewUser {
            name: Some(name),
            email: Some(email),
            role: Role::User,
            password_hash: Some(password_hash),
            ..Default::default()
        })
        .await
        .map_err(|e| match e {
            // lost a race with a concurrent registration
            DatabaseError::Conflict(_) => AuthError::EmailTaken,
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "Registered credentials user");
    Ok(user)
}
