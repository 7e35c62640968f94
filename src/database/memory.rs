use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::adapter::AuthAdapter;
use super::manager::DatabaseError;
use super::models::{Account, NewUser, Session, User, UserPatch, VerificationToken};

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    accounts: Vec<Account>,
    sessions: HashMap<String, Session>,
    // keyed by token hash, which is unique across identifiers
    verification_tokens: HashMap<String, VerificationToken>,
}

impl Store {
    fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.sessions.retain(|_, s| s.expires > now);
        self.verification_tokens.retain(|_, t| t.expires > now);
    }
}

/// Process-local `AuthAdapter`. Enforces the same uniqueness rules as the
/// PostgreSQL schema so behavior matches between the two.
#[derive(Default)]
pub struct MemoryAdapter {
    store: RwLock<Store>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.store.read().await.users.len()
    }

    pub async fn session_count(&self) -> usize {
        self.store.read().await.sessions.len()
    }

    pub async fn verification_token_count(&self) -> usize {
        self.store.read().await.verification_tokens.len()
    }
}

fn email_taken(store: &Store, email: Option<&str>, except: Option<Uuid>) -> bool {
    let Some(email) = email else {
        return false;
    };
    store
        .users
        .values()
        .any(|u| Some(u.id) != except && u.email.as_deref() == Some(email))
}

#[async_trait]
impl AuthAdapter for MemoryAdapter {
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut store = self.store.write().await;
        if email_taken(&store, user.email.as_deref(), None) {
            return Err(DatabaseError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            email_verified: user.email_verified,
            image: user.image,
            role: user.role,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let store = self.store.read().await;
        let user = store
            .accounts
            .iter()
            .find(|a| a.provider == provider && a.provider_account_id == provider_account_id)
            .and_then(|a| store.users.get(&a.user_id))
            .cloned();
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError> {
        let mut store = self.store.write().await;
        if email_taken(&store, patch.email.as_deref(), Some(id)) {
            return Err(DatabaseError::Conflict("Email already exists".to_string()));
        }

        let user = store
            .users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("User {}", id)))?;
        if !patch.is_empty() {
            patch.apply(user);
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut store = self.store.write().await;
        if store.users.remove(&id).is_none() {
            return Err(DatabaseError::NotFound(format!("User {}", id)));
        }
        store.accounts.retain(|a| a.user_id != id);
        store.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }

    async fn link_account(&self, account: Account) -> Result<Account, DatabaseError> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&account.user_id) {
            return Err(DatabaseError::NotFound(format!("User {}", account.user_id)));
        }
        let duplicate = store.accounts.iter().any(|a| {
            a.provider == account.provider && a.provider_account_id == account.provider_account_id
        });
        if duplicate {
            return Err(DatabaseError::Conflict("Account already exists".to_string()));
        }
        store.accounts.push(account.clone());
        Ok(account)
    }

    async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), DatabaseError> {
        let mut store = self.store.write().await;
        let before = store.accounts.len();
        store
            .accounts
            .retain(|a| !(a.provider == provider && a.provider_account_id == provider_account_id));
        if store.accounts.len() == before {
            return Err(DatabaseError::NotFound(format!(
                "Account {}:{}",
                provider, provider_account_id
            )));
        }
        Ok(())
    }

    async fn create_session(&self, session: Session) -> Result<Session, DatabaseError> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&session.user_id) {
            return Err(DatabaseError::NotFound(format!("User {}", session.user_id)));
        }
        if store.sessions.contains_key(&session.session_token) {
            return Err(DatabaseError::Conflict("Session already exists".to_string()));
        }
        store.purge_expired(Utc::now());
        store
            .sessions
            .insert(session.session_token.clone(), session.clone());
        Ok(session)
    }

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> Result<Option<(Session, User)>, DatabaseError> {
        let store = self.store.read().await;
        let found = store.sessions.get(session_token).and_then(|session| {
            store
                .users
                .get(&session.user_id)
                .map(|user| (session.clone(), user.clone()))
        });
        Ok(found)
    }

    async fn update_session(
        &self,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<Session>, DatabaseError> {
        let mut store = self.store.write().await;
        Ok(store.sessions.get_mut(session_token).map(|session| {
            session.expires = expires;
            session.clone()
        }))
    }

    async fn delete_session(&self, session_token: &str) -> Result<(), DatabaseError> {
        self.store.write().await.sessions.remove(session_token);
        Ok(())
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> Result<VerificationToken, DatabaseError> {
        let mut store = self.store.write().await;
        if store.verification_tokens.contains_key(&token.token) {
            return Err(DatabaseError::Conflict(
                "Verification token already exists".to_string(),
            ));
        }
        store.purge_expired(Utc::now());
        store
            .verification_tokens
            .insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>, DatabaseError> {
        let mut store = self.store.write().await;
        let matches = store
            .verification_tokens
            .get(token)
            .is_some_and(|t| t.identifier == identifier);
        if !matches {
            return Ok(None);
        }
        Ok(store.verification_tokens.remove(token))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: Some("Test User".into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_emails() {
        let adapter = MemoryAdapter::new();
        adapter.create_user(new_user("a@example.com")).await.unwrap();
        let err = adapter.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn finds_user_by_linked_account() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(new_user("a@example.com")).await.unwrap();
        adapter
            .link_account(Account::oauth(user.id, "google", "g-123"))
            .await
            .unwrap();

        let found = adapter.get_user_by_account("google", "g-123").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(adapter.get_user_by_account("github", "g-123").await.unwrap().is_none());

        let dup = adapter.link_account(Account::oauth(user.id, "google", "g-123")).await;
        assert!(matches!(dup, Err(DatabaseError::Conflict(_))));

        adapter.unlink_account("google", "g-123").await.unwrap();
        assert!(adapter.get_user_by_account("google", "g-123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_user_applies_only_present_fields() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(new_user("a@example.com")).await.unwrap();
        let updated = adapter
            .update_user(
                user.id,
                UserPatch {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.name.as_deref(), Some("Test User"));
        assert_eq!(updated.email.as_deref(), Some("a@example.com"));

        let unchanged = adapter.update_user(user.id, UserPatch::default()).await.unwrap();
        assert_eq!(unchanged.updated_at, updated.updated_at);

        let missing = adapter.update_user(Uuid::new_v4(), UserPatch::default()).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(new_user("a@example.com")).await.unwrap();
        adapter
            .link_account(Account::oauth(user.id, "google", "g-1"))
            .await
            .unwrap();
        adapter
            .create_session(Session::new(
                "tok".into(),
                user.id,
                Utc::now() + Duration::hours(1),
            ))
            .await
            .unwrap();

        adapter.delete_user(user.id).await.unwrap();
        assert_eq!(adapter.session_count().await, 0);
        assert!(adapter.get_user_by_account("google", "g-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verification_tokens_are_single_use() {
        let adapter = MemoryAdapter::new();
        adapter
            .create_verification_token(VerificationToken {
                identifier: "id".into(),
                token: "t".into(),
                expires: Utc::now() + Duration::minutes(5),
            })
            .await
            .unwrap();

        assert!(adapter.use_verification_token("other", "t").await.unwrap().is_none());
        assert!(adapter.use_verification_token("id", "t").await.unwrap().is_some());
        assert!(adapter.use_verification_token("id", "t").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn creating_rows_purges_expired_ones() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(new_user("a@example.com")).await.unwrap();
        adapter
            .create_verification_token(VerificationToken {
                identifier: "id".into(),
                token: "stale".into(),
                expires: Utc::now() - Duration::minutes(1),
            })
            .await
            .unwrap();
        adapter
            .create_session(Session::new("stale".into(), user.id, Utc::now() - Duration::minutes(1)))
            .await
            .unwrap();
        assert_eq!(adapter.verification_token_count().await, 1);
        assert_eq!(adapter.session_count().await, 1);

        adapter
            .create_verification_token(VerificationToken {
                identifier: "id".into(),
                token: "fresh".into(),
                expires: Utc::now() + Duration::minutes(5),
            })
            .await
            .unwrap();
        adapter
            .create_session(Session::new("fresh".into(), user.id, Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(adapter.verification_token_count().await, 1);
        assert!(adapter.use_verification_token("id", "stale").await.unwrap().is_none());
        assert_eq!(adapter.session_count().await, 1);
        assert!(adapter.get_session_and_user("stale").await.unwrap().is_none());
    }
}
