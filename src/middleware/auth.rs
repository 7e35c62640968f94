use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::{ActiveSession, IssuedSession};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Carries a refreshed bearer value back to clients that sent `Authorization`
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Session resolved for the current request, if any
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<ActiveSession>);

/// Extractor that rejects the request with 401 when no session is present
#[derive(Debug, Clone)]
pub struct RequireSession(pub ActiveSession);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSource {
    Header,
    Cookie,
}

/// Bearer header wins over the session cookie
fn extract_session_token(headers: &HeaderMap, jar: &CookieJar, cookie_name: &str) -> Option<(String, TokenSource)> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = from_header {
        return Some((token.to_string(), TokenSource::Header));
    }

    jar.get(cookie_name)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|t| (t, TokenSource::Cookie))
}

pub fn session_cookie(config: &AppConfig, issued: &IssuedSession) -> Cookie<'static> {
    let max_age = (issued.expires - chrono::Utc::now()).num_seconds().max(0);
    Cookie::build((config.security.cookie_name.clone(), issued.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.security.secure_cookies)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

pub fn removal_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((config.security.cookie_name.clone(), String::new()))
        .path("/")
        .build()
}

/// Resolve the caller's session and expose it as a `CurrentSession` extension.
///
/// Sessions that were slid forward are handed back: a fresh cookie for cookie
/// clients, the `x-session-token` header for bearer clients. Cookies that no
/// longer resolve are cleared. Nothing is added when the handler set a cookie
/// itself, since it already issued the newer session.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.security.cookie_name.as_str();
    let Some((token, source)) = extract_session_token(request.headers(), &jar, cookie_name) else {
        request.extensions_mut().insert(CurrentSession(None));
        return next.run(request).await;
    };

    let active = match state.sessions.resolve(&token).await {
        Ok(active) => active,
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            return ApiError::from(e).into_response();
        }
    };

    let resolved = active.is_some();
    let reissued = active.as_ref().and_then(|a| a.reissued.clone());
    request.extensions_mut().insert(CurrentSession(active));

    let response = next.run(request).await;

    if response.headers().contains_key(header::SET_COOKIE) {
        return response;
    }

    match (source, reissued) {
        (TokenSource::Header, Some(issued)) => {
            let mut response = response;
            match HeaderValue::from_str(&issued.token) {
                Ok(value) => {
                    response.headers_mut().insert(SESSION_TOKEN_HEADER, value);
                }
                Err(e) => tracing::warn!("Refreshed token is not a valid header value: {}", e),
            }
            response
        }
        (TokenSource::Header, None) => response,
        (TokenSource::Cookie, Some(issued)) => {
            (jar.add(session_cookie(&state.config, &issued)), response).into_response()
        }
        (TokenSource::Cookie, None) if !resolved => {
            (jar.remove(removal_cookie(&state.config)), response).into_response()
        }
        (TokenSource::Cookie, None) => response,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentSession>().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .and_then(|s| s.0.clone())
            .map(RequireSession)
            .ok_or_else(|| ApiError::unauthorized("You must be logged in"))
    }
}
