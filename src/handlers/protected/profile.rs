// handlers/protected/profile.rs - Profile page operations
//
// These answer with action results rather than the error envelope, so a
// missing session is reported as `success: false` with a readable message.

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Deserialize;

use crate::actions::{self, ActionResult};
use crate::middleware::CurrentSession;
use crate::services::Profile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NameForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageForm {
    pub image: String,
}

/// GET /api/profile
pub async fn profile_get(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ActionResult<Profile> {
    actions::get_profile(&state.users, session.as_ref()).await
}

/// PUT /api/profile/name
pub async fn profile_name_put(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    body: Result<Json<NameForm>, JsonRejection>,
) -> ActionResult<Profile> {
    // not-logged-in takes precedence over body errors
    if session.is_none() {
        return actions::update_user_name(&state.users, None, "").await;
    }
    match body {
        Ok(Json(form)) => actions::update_user_name(&state.users, session.as_ref(), &form.name).await,
        Err(_) => ActionResult::invalid("Name is required"),
    }
}

/// PUT /api/profile/image
pub async fn profile_image_put(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    body: Result<Json<ImageForm>, JsonRejection>,
) -> ActionResult<Profile> {
    if session.is_none() {
        return actions::update_user_image(&state.users, None, "").await;
    }
    match body {
        Ok(Json(form)) => actions::update_user_image(&state.users, session.as_ref(), &form.image).await,
        Err(_) => ActionResult::invalid("Image is required"),
    }
}
