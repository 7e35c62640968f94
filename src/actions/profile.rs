use axum::http::StatusCode;
use uuid::Uuid;

use super::ActionResult;
use crate::auth::validation::{validate_image_url, validate_name};
use crate::auth::ActiveSession;
use crate::database::DatabaseError;
use crate::services::{Profile, UserService};

pub const NOT_LOGGED_IN: &str = "You must be logged in to update your profile";
pub const NOT_LOGGED_IN_VIEW: &str = "You must be logged in to view your profile";

fn session_user(session: Option<&ActiveSession>) -> Option<Uuid> {
    let session = session?;
    match session.user_id() {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("Session without a usable user id: {}", e);
            None
        }
    }
}

fn persistence_failure(context: &str, err: DatabaseError) -> ActionResult<Profile> {
    match err {
        DatabaseError::NotFound(_) => ActionResult::failure(StatusCode::NOT_FOUND, "User not found"),
        other => ActionResult::unexpected(context, other),
    }
}

pub async fn get_profile(users: &UserService, session: Option<&ActiveSession>) -> ActionResult<Profile> {
    let Some(user_id) = session_user(session) else {
        return ActionResult::unauthenticated(NOT_LOGGED_IN_VIEW);
    };

    match users.profile(user_id).await {
        Ok(profile) => ActionResult::ok("Profile loaded", profile),
        Err(e) => persistence_failure("Profile lookup failed", e),
    }
}

pub async fn update_user_name(
    users: &UserService,
    session: Option<&ActiveSession>,
    name: &str,
) -> ActionResult<Profile> {
    let Some(user_id) = session_user(session) else {
        return ActionResult::unauthenticated(NOT_LOGGED_IN);
    };

    let name = match validate_name(name) {
        Ok(name) => name,
        Err(message) => return ActionResult::invalid(message),
    };

    match users.update_name(user_id, &name).await {
        Ok(profile) => ActionResult::ok("Name updated", profile),
        Err(e) => persistence_failure("Name update failed", e),
    }
}

pub async fn update_user_image(
    users: &UserService,
    session: Option<&ActiveSession>,
    image: &str,
) -> ActionResult<Profile> {
    let Some(user_id) = session_user(session) else {
        return ActionResult::unauthenticated(NOT_LOGGED_IN);
    };

    let image = match validate_image_url(image) {
        Ok(image) => image,
        Err(message) => return ActionResult::invalid(message),
    };

    match users.update_image(user_id, &image).await {
        Ok(profile) => ActionResult::ok("Image updated", profile),
        Err(e) => persistence_failure("Image update failed", e),
    }
}
