//! OAuth 2.0 authorization-code sign-in.
//!
//! The browser is sent to the provider with a random `state`; only the
//! SHA-256 of that state is persisted (as a verification token) so the
//! callback can prove it started here. After the code exchange the provider
//! profile is resolved to a local user, creating and linking one if needed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

use super::{AuthError, Role};
use crate::config::OAuthClientConfig;
use crate::database::models::user::normalize_email;
use crate::database::models::{Account, NewUser, User, VerificationToken};
use crate::database::AuthAdapter;

const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct OAuthProvider {
    pub id: String,
    pub client_id: String,
    client_secret: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub scopes: Vec<String>,
    pub redirect_url: Url,
}

/// Tokens returned by the provider's token endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Provider-neutral identity
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub provider_account_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<GoogleUserInfo> for OAuthProfile {
    fn from(info: GoogleUserInfo) -> Self {
        Self {
            provider_account_id: info.sub,
            email: info.email,
            email_verified: info.email_verified.unwrap_or(false),
            name: info.name,
            image: info.picture,
            role: None,
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, AuthError> {
    Url::parse(raw).map_err(|e| AuthError::Provider(format!("invalid URL '{}': {}", raw, e)))
}

impl OAuthProvider {
    pub fn google(config: &OAuthClientConfig) -> Result<Self, AuthError> {
        Ok(Self {
            id: "google".to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            authorize_url: parse_url("https://accounts.google.com/o/oauth2/v2/auth")?,
            token_url: parse_url("https://oauth2.googleapis.com/token")?,
            userinfo_url: parse_url("https://openidconnect.googleapis.com/v1/userinfo")?,
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
            redirect_url: parse_url(&config.redirect_url)?,
        })
    }

    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_url.as_str())
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        url
    }

    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<OAuthTokens, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = http
            .post(self.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %self.id, %status, "Token exchange failed: {}", body);
            return Err(AuthError::Provider(format!(
                "token endpoint returned {}",
                status
            )));
        }

        Ok(response.json::<OAuthTokens>().await?)
    }

    pub async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        tokens: &OAuthTokens,
    ) -> Result<OAuthProfile, AuthError> {
        let response = http
            .get(self.userinfo_url.clone())
            .bearer_auth(&tokens.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        let info = response.json::<GoogleUserInfo>().await?;
        Ok(info.into())
    }
}

/// Configured providers plus the HTTP client used to talk to them
#[derive(Debug, Clone, Default)]
pub struct OAuthRegistry {
    providers: HashMap<String, Arc<OAuthProvider>>,
    http: reqwest::Client,
}

impl OAuthRegistry {
    pub fn from_config(config: &crate::config::AuthConfig) -> Result<Self, AuthError> {
        let mut registry = Self::default();
        if let Some(google) = &config.google {
            registry.register(OAuthProvider::google(google)?);
        }
        Ok(registry)
    }

    pub fn register(&mut self, provider: OAuthProvider) {
        self.providers.insert(provider.id.clone(), Arc::new(provider));
    }

    pub fn get(&self, id: &str) -> Result<Arc<OAuthProvider>, AuthError> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| AuthError::UnknownProvider(id.to_string()))
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn state_identifier(provider_id: &str) -> String {
    format!("oauth-state:{}", provider_id)
}

fn hash_state(state: &str) -> String {
    hex::encode(Sha256::digest(state.as_bytes()))
}

/// Start a sign-in: persist the hashed state and return the provider URL
pub async fn begin(adapter: &dyn AuthAdapter, provider: &OAuthProvider) -> Result<Url, AuthError> {
    let state = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

    adapter
        .create_verification_token(VerificationToken {
            identifier: state_identifier(&provider.id),
            token: hash_state(&state),
            expires: Utc::now() + Duration::minutes(STATE_TTL_MINUTES),
        })
        .await?;

    Ok(provider.authorization_url(&state))
}

/// The state is consumed whether or not it is still valid
pub async fn consume_state(
    adapter: &dyn AuthAdapter,
    provider_id: &str,
    state: &str,
) -> Result<(), AuthError> {
    if state.is_empty() {
        return Err(AuthError::InvalidState);
    }

    let stored = adapter
        .use_verification_token(&state_identifier(provider_id), &hash_state(state))
        .await?;

    match stored {
        Some(token) if !token.is_expired() => Ok(()),
        Some(_) => {
            tracing::debug!(provider = %provider_id, "OAuth state expired");
            Err(AuthError::InvalidState)
        }
        None => Err(AuthError::InvalidState),
    }
}

/// Unix expiry for a provider `expires_in`; nonsense values are dropped
fn access_token_expiry(expires_in: Option<i64>) -> Option<i64> {
    expires_in
        .and_then(Duration::try_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .map(|at| at.timestamp())
}

/// Resolve a provider identity to a local user:
/// existing link, then same-email user (only when linking is allowed and the
/// provider verified the address), then a brand new user.
pub async fn complete_sign_in(
    adapter: &dyn AuthAdapter,
    provider_id: &str,
    profile: OAuthProfile,
    tokens: &OAuthTokens,
    allow_email_linking: bool,
) -> Result<User, AuthError> {
    if let Some(user) = adapter
        .get_user_by_account(provider_id, &profile.provider_account_id)
        .await?
    {
        tracing::debug!(user_id = %user.id, provider = %provider_id, "OAuth sign-in for linked account");
        return Ok(user);
    }

    let email = profile.email.as_deref().map(normalize_email);

    let user = match email.as_deref() {
        Some(email) => adapter.get_user_by_email(email).await?,
        None => None,
    };

    let user = match user {
        Some(existing) => {
            if !(allow_email_linking && profile.email_verified) {
                tracing::warn!(
                    user_id = %existing.id,
                    provider = %provider_id,
                    "OAuth sign-in blocked: email belongs to an unlinked user"
                );
                return Err(AuthError::AccountNotLinked);
            }
            tracing::info!(user_id = %existing.id, provider = %provider_id, "Linking OAuth account by verified email");
            existing
        }
        None => {
            let created = adapter
                .create_user(NewUser {
                    name: profile.name.clone(),
                    email,
                    email_verified: profile.email_verified.then(Utc::now),
                    image: profile.image.clone(),
                    role: Role::coerce(profile.role.as_deref()),
                    password_hash: None,
                })
                .await?;
            tracing::info!(user_id = %created.id, provider = %provider_id, "Created user from OAuth profile");
            created
        }
    };

    let mut account = Account::oauth(user.id, provider_id, profile.provider_account_id);
    account.access_token = Some(tokens.access_token.clone());
    account.refresh_token = tokens.refresh_token.clone();
    account.expires_at = access_token_expiry(tokens.expires_in);
    account.token_type = tokens.token_type.clone();
    account.scope = tokens.scope.clone();
    account.id_token = tokens.id_token.clone();
    adapter.link_account(account).await?;

    Ok(user)
}
