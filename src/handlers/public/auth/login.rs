// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;

use crate::auth::credentials::{self, Credentials, PROVIDER_ID};
use crate::auth::AuthError;
use crate::error::ApiError;
use crate::handlers::SessionTokenResponse;
use crate::middleware::{session_cookie, ApiResponse, CorrelationId};
use crate::state::AppState;

/// POST /auth/login - Credentials sign-in
///
/// Expected Input:
/// ```json
/// { "email": "ada@example.com", "password": "..." }
/// ```
///
/// Expected Output (also sets the session cookie):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "...",
///     "expires": "2025-01-31T12:00:00+00:00",
///     "session": { "user": { "id": "...", "name": "Ada", "email": "...", "image": null, "role": "USER" }, "expires": "..." }
///   }
/// }
/// ```
pub async fn login_post(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    jar: CookieJar,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<SessionTokenResponse>), ApiError> {
    let Json(credentials) = body.map_err(|_| ApiError::bad_request("Email and password are required"))?;

    let Some(user) = credentials::authorize(state.adapter.as_ref(), &credentials).await? else {
        tracing::info!(correlation_id = %correlation_id.as_str(), "Credentials sign-in rejected");
        return Err(AuthError::InvalidCredentials.into());
    };

    let issued = state
        .sessions
        .issue(&user, PROVIDER_ID, correlation_id.as_str())
        .await?;

    let jar = jar.add(session_cookie(&state.config, &issued));
    Ok((jar, ApiResponse::success(SessionTokenResponse::from(&issued))))
}
