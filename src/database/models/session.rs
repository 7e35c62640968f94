use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Server-side session record, used by the database session strategy
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub session_token: String,
    pub user_id: Uuid,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn new(session_token: String, user_id: Uuid, expires: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_token,
            user_id,
            expires,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }
}
