use chrono::Utc;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::models::User;

/// A detached user value, not stored anywhere
pub fn user_fixture(email: &str, role: Role) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: Some("Ada Lovelace".to_string()),
        email: Some(email.to_string()),
        email_verified: None,
        image: Some("https://example.com/ada.png".to_string()),
        role,
        password_hash: None,
        created_at: now,
        updated_at: now,
    }
}
