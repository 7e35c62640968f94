use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Users created through OAuth have no password and cannot use credentials sign-in
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Raw users row; role is stored as free text and coerced on read
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            email_verified: row.email_verified,
            image: row.image,
            role: Role::coerce(row.role.as_deref()),
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.email_verified.is_none()
            && self.image.is_none()
            && self.role.is_none()
            && self.password_hash.is_none()
    }

    pub(crate) fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = Some(name);
        }
        if let Some(email) = self.email {
            user.email = Some(email);
        }
        if let Some(verified) = self.email_verified {
            user.email_verified = Some(verified);
        }
        if let Some(image) = self.image {
            user.image = Some(image);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = Some(hash);
        }
        user.updated_at = Utc::now();
    }
}

/// Emails are compared case-insensitively everywhere
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
