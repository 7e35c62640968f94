// handlers/mod.rs - HTTP handlers in two tiers
//
// Public (no session needed) -> /health, /auth/*
// Protected (session required, 401 otherwise) -> /api/*
//
// Both tiers see the session middleware; protected handlers ask for a
// session through `RequireSession` or, for form-style actions, read the
// optional `CurrentSession` and report "not logged in" themselves.

pub mod health;
pub mod protected;
pub mod public;

use serde::Serialize;

use crate::auth::{IssuedSession, SessionView};

/// Body returned whenever a session is issued or replaced
#[derive(Debug, Serialize)]
pub struct SessionTokenResponse {
    pub token: String,
    /// RFC 3339
    pub expires: String,
    pub session: SessionView,
}

impl From<&IssuedSession> for SessionTokenResponse {
    fn from(issued: &IssuedSession) -> Self {
        Self {
            token: issued.token.clone(),
            expires: issued.expires.to_rfc3339(),
            session: issued.claims.session_view(),
        }
    }
}
