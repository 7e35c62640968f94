//! Session token lifecycle.
//!
//! `TokenClaims` is rebuilt at every step rather than mutated: sign-in
//! produces a fresh value, the update trigger merges client-supplied profile
//! fields into a copy, refresh slides the expiry on a copy. The session view
//! is the projection handed back to clients.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, Role};
use crate::database::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// "credentials", an OAuth provider id, or absent for database sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Id of the request that created the session; kept for its whole life
    pub correlation_id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Profile fields a client may push through the session update trigger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub role: Role,
}

/// What clients see as "the session"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub user: SessionUser,
    /// RFC 3339
    pub expires: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl TokenClaims {
    /// Build the token issued when a user signs in
    pub fn on_sign_in(user: &User, provider: Option<&str>, correlation_id: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            picture: user.image.clone(),
            role: user.role,
            provider: provider.map(str::to_string),
            correlation_id: correlation_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Handle the update trigger. With no user payload the token comes back
    /// exactly as it was.
    pub fn on_update(self, update: Option<SessionUpdate>) -> Self {
        let Some(update) = update else {
            tracing::warn!(
                correlation_id = %self.correlation_id,
                sub = %self.sub,
                "Session update triggered without user data, keeping token unchanged"
            );
            return self;
        };

        let name = non_blank(update.name).or(self.name);
        let email = non_blank(update.email)
            .map(|e| crate::database::models::user::normalize_email(&e))
            .or(self.email);
        let picture = non_blank(update.image).or(self.picture);

        tracing::debug!(correlation_id = %self.correlation_id, "Merged session update into token");

        Self {
            name,
            email,
            picture,
            ..self
        }
    }

    /// Sliding expiry: once the token is older than `update_age`, issue a copy
    /// with fresh timestamps. Younger tokens are returned untouched.
    pub fn on_refresh(self, ttl: Duration, update_age: Duration) -> Self {
        let now = Utc::now();
        if now.timestamp() - self.iat < update_age.num_seconds() {
            return self;
        }

        Self {
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            ..self
        }
    }

    pub fn session_view(&self) -> SessionView {
        SessionView {
            user: SessionUser {
                id: self.sub.clone(),
                name: self.name.clone(),
                email: self.email.clone(),
                image: self.picture.clone(),
                role: self.role,
            },
            expires: self.expires_at().to_rfc3339(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AuthError::Validation(format!("Token subject '{}' is not a user id", self.sub)))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

pub fn encode_token(claims: &TokenClaims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), claims, &key)?)
}

/// Verify signature and expiry
pub fn decode_token(token: &str, secret: &str) -> Result<TokenClaims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    Ok(decode::<TokenClaims>(token, &key, &validation)?.claims)
}
