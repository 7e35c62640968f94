use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::manager::DatabaseError;
use crate::database::models::{User, UserPatch};
use crate::database::models::user::normalize_email;
use crate::database::AuthAdapter;

/// Public profile fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub role: Role,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            role: user.role,
        }
    }
}

/// Thin persistence wrapper for profile reads and writes. Callers validate.
#[derive(Clone)]
pub struct UserService {
    adapter: Arc<dyn AuthAdapter>,
}

impl UserService {
    pub fn new(adapter: Arc<dyn AuthAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn profile(&self, id: Uuid) -> Result<Profile, DatabaseError> {
        self.adapter
            .get_user(id)
            .await?
            .map(Profile::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("User {}", id)))
    }

    pub async fn update_name(&self, id: Uuid, name: &str) -> Result<Profile, DatabaseError> {
        let user = self
            .adapter
            .update_user(
                id,
                UserPatch {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(user_id = %id, "Updated user name");
        Ok(user.into())
    }

    pub async fn update_image(&self, id: Uuid, image: &str) -> Result<Profile, DatabaseError> {
        let user = self
            .adapter
            .update_user(
                id,
                UserPatch {
                    image: Some(image.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(user_id = %id, "Updated user image");
        Ok(user.into())
    }

    pub async fn set_role(&self, email: &str, role: Role) -> Result<Profile, DatabaseError> {
        let email = normalize_email(email);
        let user = self
            .adapter
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with email {}", email)))?;

        let user = self
            .adapter
            .update_user(
                user.id,
                UserPatch {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(user_id = %user.id, role = %role, "Changed user role");
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewUser;
    use crate::database::MemoryAdapter;

    async fn service_with_user() -> (UserService, Uuid) {
        let adapter = Arc::new(MemoryAdapter::new());
        let user = adapter
            .create_user(NewUser {
                name: Some("Grace".into()),
                email: Some("grace@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        (UserService::new(adapter), user.id)
    }

    #[tokio::test]
    async fn reads_and_updates_profile() {
        let (users, id) = service_with_user().await;

        let profile = users.profile(id).await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Grace"));
        assert_eq!(profile.role, Role::User);

        let profile = users.update_name(id, "Grace Hopper").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Grace Hopper"));

        let profile = users
            .update_image(id, "https://example.com/grace.png")
            .await
            .unwrap();
        assert_eq!(profile.image.as_deref(), Some("https://example.com/grace.png"));
        assert_eq!(profile.name.as_deref(), Some("Grace Hopper"));
    }

    #[tokio::test]
    async fn set_role_by_email() {
        let (users, id) = service_with_user().await;
        let profile = users.set_role(" Grace@Example.com ", Role::Admin).await.unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.role, Role::Admin);

        assert!(matches!(
            users.set_role("nobody@example.com", Role::Admin).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let (users, _) = service_with_user().await;
        assert!(matches!(
            users.profile(Uuid::new_v4()).await,
            Err(DatabaseError::NotFound(_))
        ));
    }
}
