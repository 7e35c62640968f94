use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Account, NewUser, Session, User, UserPatch, VerificationToken};

/// Persistence contract for users, OAuth account links, database sessions and
/// verification tokens. Lookups return `Ok(None)` for missing rows; writes that
/// target a missing row return `DatabaseError::NotFound`.
#[async_trait]
pub trait AuthAdapter: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// `email` must already be normalized
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, DatabaseError>;

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError>;

    /// Also removes the user's accounts and sessions
    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn link_account(&self, account: Account) -> Result<Account, DatabaseError>;

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), DatabaseError>;

    async fn create_session(&self, session: Session) -> Result<Session, DatabaseError>;

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> Result<Option<(Session, User)>, DatabaseError>;

    async fn update_session(
        &self,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<Session>, DatabaseError>;

    async fn delete_session(&self, session_token: &str) -> Result<(), DatabaseError>;

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> Result<VerificationToken, DatabaseError>;

    /// Returns and deletes the token; a token can be used at most once
    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>, DatabaseError>;

    /// Storage liveness check used by /health
    async fn health_check(&self) -> Result<(), DatabaseError>;
}
