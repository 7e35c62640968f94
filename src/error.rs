// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::DatabaseError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (OAuth provider failures)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::ValidationError(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }

    /// Error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::Migrate(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::InvalidToken(_) => ApiError::unauthorized("Invalid or expired session"),
            AuthError::InvalidState => ApiError::bad_request(err.to_string()),
            AuthError::Validation(msg) => ApiError::validation_error(msg),
            AuthError::RegistrationDisabled => ApiError::forbidden(err.to_string()),
            AuthError::EmailTaken | AuthError::AccountNotLinked => ApiError::conflict(err.to_string()),
            AuthError::UnknownProvider(_) => ApiError::not_found(err.to_string()),
            AuthError::Provider(msg) => {
                tracing::warn!("OAuth provider error: {}", msg);
                ApiError::bad_gateway("Sign-in provider returned an error")
            }
            AuthError::Http(e) => {
                tracing::warn!("OAuth provider request failed: {}", e);
                ApiError::bad_gateway("Sign-in provider is unavailable")
            }
            AuthError::MissingSecret => {
                tracing::error!("Session secret not configured");
                ApiError::internal_server_error("Authentication is not configured")
            }
            AuthError::Hash(e) => {
                tracing::error!("Password hashing failed: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Task(e) => {
                tracing::error!("Blocking task failed: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Database(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
