// handlers/public/auth/register.rs - POST /auth/register handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::actions::{self, ActionResult};
use crate::auth::Registration;
use crate::services::Profile;
use crate::state::AppState;

/// POST /auth/register - Create a credentials account
///
/// Expected Input:
/// ```json
/// { "name": "Ada Lovelace", "email": "ada@example.com", "password": "at least 8 chars" }
/// ```
///
/// Responds with an action result; `data` holds the new profile on success.
/// The account is not signed in.
pub async fn register_post(
    State(state): State<AppState>,
    body: Result<Json<Registration>, JsonRejection>,
) -> ActionResult<Profile> {
    let Json(registration) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!("Rejected registration body: {}", rejection);
            return ActionResult::invalid("Name, email and password are required");
        }
    };

    actions::sign_up(state.adapter.as_ref(), &state.config, registration).await
}
