use serde::{Deserialize, Deserializer, Serialize};

/// Authorization role carried on the user record and in session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Coerce a stored or client-supplied role string. Only the exact
    /// strings "ADMIN" and "USER" are recognized; everything else is USER.
    pub fn coerce(value: Option<&str>) -> Self {
        match value {
            Some("ADMIN") => Role::Admin,
            Some("USER") => Role::User,
            other => {
                if let Some(raw) = other {
                    tracing::debug!("Unrecognized role '{}', defaulting to USER", raw);
                }
                Role::User
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::coerce(Some(s)))
    }
}

// Tokens minted by older builds or foreign issuers may carry any value here
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Role::coerce(raw.as_deref()))
    }
}
