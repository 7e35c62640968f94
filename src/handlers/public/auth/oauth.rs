// handlers/public/auth/oauth.rs - OAuth redirect and callback

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::auth::oauth;
use crate::error::ApiError;
use crate::handlers::SessionTokenResponse;
use crate::middleware::{session_cookie, ApiResponse, CorrelationId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/oauth/:provider - 303 to the provider's consent page
pub async fn oauth_start(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Redirect, ApiError> {
    let provider = state.oauth.get(&provider_id)?;
    let url = oauth::begin(state.adapter.as_ref(), &provider).await?;
    tracing::debug!(provider = %provider_id, "Redirecting to OAuth provider");
    Ok(Redirect::to(url.as_str()))
}

/// GET /auth/oauth/:provider/callback - Finish sign-in
///
/// The state is checked before the code is exchanged. On success the
/// session cookie is set and the same body as `/auth/login` is returned.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(params): Query<CallbackParams>,
    correlation_id: CorrelationId,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<SessionTokenResponse>), ApiError> {
    let provider = state.oauth.get(&provider_id)?;

    if let Some(error) = params.error {
        tracing::info!(provider = %provider_id, "OAuth sign-in declined: {}", error);
        return Err(ApiError::unauthorized("Sign-in was cancelled or denied"));
    }

    oauth::consume_state(
        state.adapter.as_ref(),
        &provider.id,
        params.state.as_deref().unwrap_or_default(),
    )
    .await?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let http = state.oauth.http();
    let tokens = provider.exchange_code(http, &code).await?;
    let profile = provider.fetch_profile(http, &tokens).await?;

    let user = oauth::complete_sign_in(
        state.adapter.as_ref(),
        &provider.id,
        profile,
        &tokens,
        state.config.auth.allow_email_linking,
    )
    .await?;

    let issued = state
        .sessions
        .issue(&user, &provider.id, correlation_id.as_str())
        .await?;

    let jar = jar.add(session_cookie(&state.config, &issued));
    Ok((jar, ApiResponse::success(SessionTokenResponse::from(&issued))))
}
