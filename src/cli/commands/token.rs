use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{decode_token, TokenClaims};
use crate::cli::utils::{connect, load_config, output_details};
use crate::cli::OutputFormat;
use crate::config::SessionStrategy;
use crate::database::models::user::normalize_email;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Verify a session JWT and print its claims")]
    Inspect {
        #[arg(help = "Encoded token")]
        token: String,
    },

    #[command(about = "Issue a session for a user, for scripting and local testing")]
    Mint {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, default_value = "credentials", help = "Provider recorded in the token")]
        provider: String,
    },
}

fn claims_json(claims: &TokenClaims) -> serde_json::Value {
    json!({
        "sub": claims.sub,
        "name": claims.name,
        "email": claims.email,
        "role": claims.role.as_str(),
        "provider": claims.provider,
        "correlation_id": claims.correlation_id,
        "issued_at": claims.iat,
        "expires": claims.expires_at().to_rfc3339(),
    })
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Inspect { token } => {
            let config = load_config()?;
            if config.security.session_strategy == SessionStrategy::Database {
                return Err(anyhow!("Database sessions are opaque; inspect only works for JWT sessions"));
            }
            let claims = decode_token(token.trim(), &config.security.jwt_secret)?;
            output_details(&output_format, "Token is valid", claims_json(&claims))
        }
        TokenCommands::Mint { email, provider } => {
            let state = connect().await?;
            let email = normalize_email(&email);
            let user = state
                .adapter
                .get_user_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("No user with email {}", email))?;

            let correlation_id = format!("authctl-{}", Uuid::new_v4().simple());
            let issued = state.sessions.issue(&user, &provider, &correlation_id).await?;

            let mut details = claims_json(&issued.claims);
            details["token"] = json!(issued.token);
            output_details(&output_format, "Session issued", details)
        }
    }
}
