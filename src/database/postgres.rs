use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::adapter::AuthAdapter;
use super::manager::{DatabaseError, DatabaseManager};
use super::models::user::UserRow;
use super::models::{Account, NewUser, Session, User, UserPatch, VerificationToken};

const USER_COLUMNS: &str =
    "id, name, email, email_verified, image, role, password_hash, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "id, user_id, type, provider, provider_account_id, refresh_token, \
     access_token, expires_at, token_type, scope, id_token, session_state";

/// `AuthAdapter` backed by PostgreSQL
#[derive(Clone)]
pub struct PgAdapter {
    pool: PgPool,
}

impl PgAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthAdapter for PgAdapter {
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let query = format!(
            "INSERT INTO users (id, name, email, email_verified, image, role, password_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.email_verified)
            .bind(&user.image)
            .bind(user.role.as_str())
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, "User"))?;

        Ok(row.into())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM users
             WHERE id = (
                 SELECT user_id FROM accounts
                 WHERE provider = $1 AND provider_account_id = $2
             )",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(provider)
            .bind(provider_account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError> {
        if patch.is_empty() {
            return self
                .get_user(id)
                .await?
                .ok_or_else(|| DatabaseError::NotFound(format!("User {}", id)));
        }

        let query = format!(
            "UPDATE users SET
                 name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 email_verified = COALESCE($4, email_verified),
                 image = COALESCE($5, image),
                 role = COALESCE($6, role),
                 password_hash = COALESCE($7, password_hash),
                 updated_at = now()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.email)
            .bind(patch.email_verified)
            .bind(&patch.image)
            .bind(patch.role.map(|r| r.as_str()))
            .bind(&patch.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, "Email"))?;

        row.map(User::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("User {}", id)))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError> {
        // accounts and sessions cascade
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {}", id)));
        }
        Ok(())
    }

    async fn link_account(&self, account: Account) -> Result<Account, DatabaseError> {
        let query = format!(
            "INSERT INTO accounts ({})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {}",
            ACCOUNT_COLUMNS, ACCOUNT_COLUMNS
        );
        let linked = sqlx::query_as::<_, Account>(&query)
            .bind(account.id)
            .bind(account.user_id)
            .bind(&account.account_type)
            .bind(&account.provider)
            .bind(&account.provider_account_id)
            .bind(&account.refresh_token)
            .bind(&account.access_token)
            .bind(account.expires_at)
            .bind(&account.token_type)
            .bind(&account.scope)
            .bind(&account.id_token)
            .bind(&account.session_state)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, "Account"))?;
        Ok(linked)
    }

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), DatabaseError> {
        let result =
            sqlx::query("DELETE FROM accounts WHERE provider = $1 AND provider_account_id = $2")
                .bind(provider)
                .bind(provider_account_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Account {}:{}",
                provider, provider_account_id
            )));
        }
        Ok(())
    }

    async fn create_session(&self, session: Session) -> Result<Session, DatabaseError> {
        let purged = sqlx::query("DELETE FROM sessions WHERE expires <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            tracing::debug!(purged, "Removed expired sessions");
        }

        let created = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, session_token, user_id, expires)
             VALUES ($1, $2, $3, $4)
             RETURNING id, session_token, user_id, expires",
        )
        .bind(session.id)
        .bind(&session.session_token)
        .bind(session.user_id)
        .bind(session.expires)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Session"))?;
        Ok(created)
    }

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> Result<Option<(Session, User)>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, session_token, user_id, expires FROM sessions WHERE session_token = $1",
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        Ok(self.get_user(session.user_id).await?.map(|user| (session, user)))
    }

    async fn update_session(
        &self,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<Session>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>(
            "UPDATE sessions SET expires = $2 WHERE session_token = $1
             RETURNING id, session_token, user_id, expires",
        )
        .bind(session_token)
        .bind(expires)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, session_token: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM sessions WHERE session_token = $1")
            .bind(session_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> Result<VerificationToken, DatabaseError> {
        sqlx::query("DELETE FROM verification_tokens WHERE expires <= NOW()")
            .execute(&self.pool)
            .await?;

        let created = sqlx::query_as::<_, VerificationToken>(
            "INSERT INTO verification_tokens (identifier, token, expires)
             VALUES ($1, $2, $3)
             RETURNING identifier, token, expires",
        )
        .bind(&token.identifier)
        .bind(&token.token)
        .bind(token.expires)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Verification token"))?;
        Ok(created)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>, DatabaseError> {
        let used = sqlx::query_as::<_, VerificationToken>(
            "DELETE FROM verification_tokens
             WHERE identifier = $1 AND token = $2
             RETURNING identifier, token, expires",
        )
        .bind(identifier)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(used)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
