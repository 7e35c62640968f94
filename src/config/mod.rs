use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEVELOPMENT_SECRET: &str = "development-secret-change-me";

/// Upper bound for session lifetimes, in hours (ten years)
pub const MAX_SESSION_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStrategy {
    /// Stateless signed token, nothing persisted per session
    Jwt,
    /// Opaque token referencing a row in the sessions table
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub session_update_age_hours: u64,
    pub session_strategy: SessionStrategy,
    pub bcrypt_cost: u32,
    pub cookie_name: String,
    pub secure_cookies: bool,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub store: StoreBackend,
    pub allow_registration: bool,
    pub allow_email_linking: bool,
    pub google: Option<OAuthClientConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("SERVER_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("AUTH_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_SESSION_UPDATE_AGE_HOURS") {
            self.security.session_update_age_hours =
                v.parse().unwrap_or(self.security.session_update_age_hours);
        }
        if let Ok(v) = env::var("SECURITY_SESSION_STRATEGY") {
            self.security.session_strategy = match v.as_str() {
                "database" => SessionStrategy::Database,
                "jwt" => SessionStrategy::Jwt,
                _ => self.security.session_strategy,
            };
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_NAME") {
            self.security.cookie_name = v;
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_STORE") {
            self.auth.store = match v.as_str() {
                "memory" => StoreBackend::Memory,
                "postgres" => StoreBackend::Postgres,
                _ => self.auth.store,
            };
        }
        if let Ok(v) = env::var("AUTH_ALLOW_REGISTRATION") {
            self.auth.allow_registration = v.parse().unwrap_or(self.auth.allow_registration);
        }
        if let Ok(v) = env::var("AUTH_ALLOW_EMAIL_LINKING") {
            self.auth.allow_email_linking = v.parse().unwrap_or(self.auth.allow_email_linking);
        }
        if let (Ok(client_id), Ok(client_secret)) =
            (env::var("GOOGLE_CLIENT_ID"), env::var("GOOGLE_CLIENT_SECRET"))
        {
            let redirect_url = env::var("GOOGLE_REDIRECT_URL").unwrap_or_else(|_| {
                format!(
                    "http://localhost:{}/auth/oauth/google/callback",
                    self.server.port
                )
            });
            self.auth.google = Some(OAuthClientConfig {
                client_id,
                client_secret,
                redirect_url,
            });
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 30, // 30 days
                session_update_age_hours: 24,
                session_strategy: SessionStrategy::Jwt,
                bcrypt_cost: 10,
                cookie_name: "session-token".to_string(),
                secure_cookies: false,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            auth: AuthConfig {
                store: StoreBackend::Postgres,
                allow_registration: true,
                allow_email_linking: false,
                google: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                session_update_age_hours: 24,
                session_strategy: SessionStrategy::Jwt,
                bcrypt_cost: 12,
                cookie_name: "__Secure-session-token".to_string(),
                secure_cookies: true,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            auth: AuthConfig {
                store: StoreBackend::Postgres,
                allow_registration: true,
                allow_email_linking: false,
                google: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                session_update_age_hours: 24,
                session_strategy: SessionStrategy::Jwt,
                bcrypt_cost: 12,
                cookie_name: "__Secure-session-token".to_string(),
                secure_cookies: true,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            auth: AuthConfig {
                store: StoreBackend::Postgres,
                allow_registration: true,
                allow_email_linking: false,
                google: None,
            },
        }
    }

    /// Configuration for tests: in-memory store, minimum bcrypt cost, fixed secret
    pub fn testing() -> Self {
        let mut config = Self::development();
        config.auth.store = StoreBackend::Memory;
        config.security.bcrypt_cost = 4;
        config.security.jwt_secret = "test-secret".to_string();
        config.database.run_migrations = false;
        config
    }

    /// Refuse to start without a signing secret outside development
    pub fn validate(&self) -> Result<(), String> {
        if self.security.jwt_secret.is_empty() {
            return Err("AUTH_SECRET must be set".to_string());
        }
        if self.environment == Environment::Production && self.security.jwt_secret == DEVELOPMENT_SECRET {
            return Err("AUTH_SECRET must not use the development default in production".to_string());
        }
        if self.security.jwt_expiry_hours == 0 || self.security.jwt_expiry_hours > MAX_SESSION_HOURS {
            return Err(format!(
                "SECURITY_JWT_EXPIRY_HOURS must be between 1 and {}",
                MAX_SESSION_HOURS
            ));
        }
        if self.security.session_update_age_hours > self.security.jwt_expiry_hours {
            return Err("SECURITY_SESSION_UPDATE_AGE_HOURS must not exceed SECURITY_JWT_EXPIRY_HOURS".to_string());
        }
        if self.auth.store == StoreBackend::Postgres && self.database.url.is_none() {
            return Err("DATABASE_URL must be set when AUTH_STORE=postgres".to_string());
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err("SECURITY_BCRYPT_COST must be between 4 and 31".to_string());
        }
        Ok(())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
