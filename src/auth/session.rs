use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::claims::{decode_token, encode_token, SessionUpdate, TokenClaims};
use super::AuthError;
use crate::config::{AppConfig, SessionStrategy, MAX_SESSION_HOURS};
use crate::database::models::{Session, User};
use crate::database::AuthAdapter;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub strategy: SessionStrategy,
    pub secret: String,
    pub max_age: Duration,
    pub update_age: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            strategy: config.security.session_strategy,
            secret: config.security.jwt_secret.clone(),
            max_age: bounded_hours(config.security.jwt_expiry_hours),
            update_age: bounded_hours(config.security.session_update_age_hours),
        }
    }
}

fn bounded_hours(hours: u64) -> Duration {
    if hours > MAX_SESSION_HOURS {
        tracing::warn!(hours, max = MAX_SESSION_HOURS, "Session lifetime clamped");
    }
    // MAX_SESSION_HOURS fits comfortably in an i64 Duration
    Duration::hours(hours.min(MAX_SESSION_HOURS) as i64)
}

/// A session handed to a client
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Bearer value: a JWT or an opaque database session token
    pub token: String,
    pub claims: TokenClaims,
    pub expires: DateTime<Utc>,
}

/// A session resolved from an incoming request
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub token: String,
    pub claims: TokenClaims,
    /// Set when resolving slid the expiry and the client should store a new value
    pub reissued: Option<IssuedSession>,
}

impl ActiveSession {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        self.claims.user_id()
    }

    fn unchanged(&self) -> IssuedSession {
        IssuedSession {
            token: self.token.clone(),
            claims: self.claims.clone(),
            expires: self.claims.expires_at(),
        }
    }
}

/// Issues, resolves, updates and revokes sessions under the configured strategy
#[derive(Clone)]
pub struct SessionManager {
    adapter: Arc<dyn AuthAdapter>,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(adapter: Arc<dyn AuthAdapter>, settings: SessionSettings) -> Self {
        Self { adapter, settings }
    }

    pub async fn issue(
        &self,
        user: &User,
        provider: &str,
        correlation_id: &str,
    ) -> Result<IssuedSession, AuthError> {
        let claims = TokenClaims::on_sign_in(user, Some(provider), correlation_id, self.settings.max_age);

        let issued = match self.settings.strategy {
            SessionStrategy::Jwt => IssuedSession {
                token: encode_token(&claims, &self.settings.secret)?,
                expires: claims.expires_at(),
                claims,
            },
            SessionStrategy::Database => {
                let session_token = generate_session_token();
                let session = self
                    .adapter
                    .create_session(Session::new(session_token, user.id, claims.expires_at()))
                    .await?;
                IssuedSession {
                    token: session.session_token,
                    expires: session.expires,
                    claims,
                }
            }
        };

        tracing::info!(
            user_id = %user.id,
            provider = %provider,
            correlation_id = %correlation_id,
            strategy = ?self.settings.strategy,
            "Issued session"
        );
        Ok(issued)
    }

    /// Look up the session behind a bearer value. Anything invalid resolves to
    /// `None`; only storage failures are errors.
    pub async fn resolve(&self, token: &str) -> Result<Option<ActiveSession>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        match self.settings.strategy {
            SessionStrategy::Jwt => Ok(self.resolve_jwt(token)),
            SessionStrategy::Database => self.resolve_database(token).await,
        }
    }

    fn resolve_jwt(&self, token: &str) -> Option<ActiveSession> {
        let claims = match decode_token(token, &self.settings.secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                return None;
            }
        };

        let refreshed = claims
            .clone()
            .on_refresh(self.settings.max_age, self.settings.update_age);

        let reissued = if refreshed != claims {
            match encode_token(&refreshed, &self.settings.secret) {
                Ok(token) => Some(IssuedSession {
                    token,
                    expires: refreshed.expires_at(),
                    claims: refreshed,
                }),
                Err(e) => {
                    tracing::warn!("Failed to re-encode refreshed token: {}", e);
                    None
                }
            }
        } else {
            None
        };

        match reissued {
            Some(issued) => Some(ActiveSession {
                token: issued.token.clone(),
                claims: issued.claims.clone(),
                reissued: Some(issued),
            }),
            None => Some(ActiveSession {
                token: token.to_string(),
                claims,
                reissued: None,
            }),
        }
    }

    async fn resolve_database(&self, token: &str) -> Result<Option<ActiveSession>, AuthError> {
        let Some((session, user)) = self.adapter.get_session_and_user(token).await? else {
            return Ok(None);
        };

        if session.is_expired() {
            tracing::debug!(session_id = %session.id, "Removing expired session");
            self.adapter.delete_session(token).await?;
            return Ok(None);
        }

        let mut session = session;
        let mut reissued = None;

        // Extend once the session has been held longer than update_age
        let issued_at = session.expires - self.settings.max_age;
        if Utc::now() - issued_at >= self.settings.update_age {
            let expires = Utc::now() + self.settings.max_age;
            if let Some(updated) = self.adapter.update_session(token, expires).await? {
                session = updated;
                let claims = database_claims(&session, &user, self.settings.max_age);
                reissued = Some(IssuedSession {
                    token: token.to_string(),
                    expires: session.expires,
                    claims,
                });
            }
        }

        Ok(Some(ActiveSession {
            token: token.to_string(),
            claims: database_claims(&session, &user, self.settings.max_age),
            reissued,
        }))
    }

    /// Apply the session update trigger
    pub async fn update(
        &self,
        active: &ActiveSession,
        update: Option<SessionUpdate>,
    ) -> Result<IssuedSession, AuthError> {
        match self.settings.strategy {
            SessionStrategy::Jwt => {
                let claims = active.claims.clone().on_update(update);
                if claims == active.claims {
                    return Ok(active.unchanged());
                }
                Ok(IssuedSession {
                    token: encode_token(&claims, &self.settings.secret)?,
                    expires: claims.expires_at(),
                    claims,
                })
            }
            SessionStrategy::Database => {
                if update.is_none() {
                    // logs the warning and hands back the same claims
                    let claims = active.claims.clone().on_update(None);
                    return Ok(IssuedSession {
                        token: active.token.clone(),
                        expires: claims.expires_at(),
                        claims,
                    });
                }

                let expires = Utc::now() + self.settings.max_age;
                let Some(session) = self.adapter.update_session(&active.token, expires).await? else {
                    return Err(AuthError::Validation("Session no longer exists".to_string()));
                };
                let user = self
                    .adapter
                    .get_user(session.user_id)
                    .await?
                    .ok_or_else(|| AuthError::Validation("Session user no longer exists".to_string()))?;

                let claims = database_claims(&session, &user, self.settings.max_age).on_update(update);
                Ok(IssuedSession {
                    token: active.token.clone(),
                    expires: session.expires,
                    claims,
                })
            }
        }
    }

    pub async fn revoke(&self, active: &ActiveSession) -> Result<(), AuthError> {
        if self.settings.strategy == SessionStrategy::Database {
            self.adapter.delete_session(&active.token).await?;
        }
        tracing::info!(
            sub = %active.claims.sub,
            correlation_id = %active.claims.correlation_id,
            "Session revoked"
        );
        Ok(())
    }
}

fn generate_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Claims for a database session are derived from the stored rows; the
/// session id doubles as correlation id.
fn database_claims(session: &Session, user: &User, max_age: Duration) -> TokenClaims {
    TokenClaims {
        sub: user.id.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        picture: user.image.clone(),
        role: user.role,
        provider: None,
        correlation_id: session.id.to_string(),
        iat: (session.expires - max_age).timestamp(),
        exp: session.expires.timestamp(),
        jti: session.id.to_string(),
    }
}
