use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Link between a local user and an identity at an OAuth provider
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    #[serde(skip_serializing)]
    pub id_token: Option<String>,
    pub session_state: Option<String>,
}

impl Account {
    pub fn oauth(user_id: Uuid, provider: impl Into<String>, provider_account_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            account_type: "oauth".to_string(),
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            refresh_token: None,
            access_token: None,
            expires_at: None,
            token_type: None,
            scope: None,
            id_token: None,
            session_state: None,
        }
    }
}
