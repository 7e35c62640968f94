use axum::http::StatusCode;

use super::ActionResult;
use crate::auth::credentials::{self, Registration};
use crate::auth::AuthError;
use crate::config::AppConfig;
use crate::database::AuthAdapter;
use crate::services::Profile;

/// Credentials sign-up. The caller signs in separately afterwards.
pub async fn sign_up(
    adapter: &dyn AuthAdapter,
    config: &AppConfig,
    registration: Registration,
) -> ActionResult<Profile> {
    if !config.auth.allow_registration {
        return ActionResult::failure(StatusCode::FORBIDDEN, AuthError::RegistrationDisabled.to_string());
    }

    match credentials::register(adapter, registration, config.security.bcrypt_cost).await {
        Ok(user) => ActionResult::ok("Account created", Profile::from(user)).with_status(StatusCode::CREATED),
        Err(AuthError::Validation(message)) => ActionResult::invalid(message),
        Err(e @ AuthError::EmailTaken) => ActionResult::failure(StatusCode::CONFLICT, e.to_string()),
        Err(e) => ActionResult::unexpected("Registration failed", e),
    }
}
