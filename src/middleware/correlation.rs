use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

const MAX_CORRELATION_ID_LEN: usize = 128;

/// Id tying together the log lines of one request and, through the token,
/// of the session that request created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn accept_incoming(value: &HeaderValue) -> Option<String> {
    let value = value.to_str().ok()?.trim();
    let valid = !value.is_empty()
        && value.len() <= MAX_CORRELATION_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    valid.then(|| value.to_string())
}

/// Reuse the caller's correlation id or mint one, run the request inside a
/// `request` span and echo the id back on the response
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(accept_incoming)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(CorrelationId(id.clone()));

    let span = tracing::info_span!(
        "request",
        correlation_id = %id,
        method = %request.method(),
        path = %request.uri().path()
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CorrelationId>()
            .cloned()
            .unwrap_or_else(|| CorrelationId(Uuid::new_v4().to_string())))
    }
}
