use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::{SessionUpdate, SessionView};
use crate::error::ApiError;
use crate::handlers::SessionTokenResponse;
use crate::middleware::{removal_cookie, session_cookie, ApiResponse, ApiResult, CurrentSession, RequireSession};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SessionPatch {
    #[serde(default)]
    pub user: Option<SessionUpdate>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub signed_out: bool,
}

/// GET /api/auth/session - The caller's session as clients see it
pub async fn session_get(RequireSession(session): RequireSession) -> ApiResult<SessionView> {
    Ok(ApiResponse::success(session.claims.session_view()))
}

/// PATCH /api/auth/session - Session update trigger
///
/// Expected Input (optional):
/// ```json
/// { "user": { "name": "New Name", "image": "https://..." } }
/// ```
///
/// Without a `user` object the current token is handed back unchanged.
/// Role, id and correlation id can never be changed this way.
pub async fn session_patch(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    jar: CookieJar,
    body: Option<Json<SessionPatch>>,
) -> Result<(CookieJar, ApiResponse<SessionTokenResponse>), ApiError> {
    let update = body.and_then(|Json(patch)| patch.user);
    let issued = state.sessions.update(&session, update).await?;

    let jar = jar.add(session_cookie(&state.config, &issued));
    Ok((jar, ApiResponse::success(SessionTokenResponse::from(&issued))))
}

/// POST /api/auth/logout - Revoke the session and clear the cookie.
/// Succeeds without a session so clients can always call it.
pub async fn session_logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<LogoutResponse>), ApiError> {
    if let Some(session) = session {
        state.sessions.revoke(&session).await?;
    }

    let jar = jar.remove(removal_cookie(&state.config));
    Ok((jar, ApiResponse::success(LogoutResponse { signed_out: true })))
}
