//! Form-style operations. Each returns an [`ActionResult`] instead of an
//! error so the caller can show `message` next to the form; unexpected
//! failures are logged and replaced by [`GENERIC_ERROR`].

pub mod auth;
pub mod profile;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

pub use auth::sign_up;
pub use profile::{get_profile, update_user_image, update_user_name};

pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Serialize)]
pub struct ActionResult<T = ()> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    pub status: StatusCode,
}

impl<T> ActionResult<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            status,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::UNAUTHORIZED, message)
    }

    /// Log the real cause, hand the caller the generic message
    pub fn unexpected(context: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", context, err);
        Self::failure(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_omits_data() {
        let result: ActionResult<String> = ActionResult::invalid("Name must be at least 3 characters");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "Name must be at least 3 characters"})
        );
        assert_eq!(result.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unexpected_uses_generic_message() {
        let result: ActionResult = ActionResult::unexpected("Profile update failed", "connection reset");
        assert!(!result.success);
        assert_eq!(result.message, GENERIC_ERROR);
        assert_eq!(result.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
