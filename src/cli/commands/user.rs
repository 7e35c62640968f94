use anyhow::{anyhow, Context};
use clap::Subcommand;
use serde_json::json;

use crate::auth::credentials::{self, Registration};
use crate::auth::Role;
use crate::cli::utils::{connect, output_details, output_success, parse_role};
use crate::cli::OutputFormat;
use crate::database::models::user::normalize_email;
use crate::services::Profile;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a credentials user")]
    Create {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, env = "AUTHCTL_PASSWORD", help = "Password (or AUTHCTL_PASSWORD)")]
        password: String,
        #[arg(long, help = "Create the user as ADMIN")]
        admin: bool,
    },

    #[command(about = "Show a user")]
    Show {
        #[arg(help = "Email address")]
        email: String,
    },

    #[command(about = "Delete a user with their linked accounts and sessions")]
    Delete {
        #[arg(help = "Email address")]
        email: String,
    },

    #[command(about = "Change a user's role")]
    Role {
        #[arg(help = "Email address")]
        email: String,
        #[arg(value_parser = parse_role, help = "ADMIN or USER")]
        role: Role,
    },
}

fn profile_json(profile: &Profile) -> serde_json::Value {
    json!({
        "id": profile.id.to_string(),
        "name": profile.name,
        "email": profile.email,
        "image": profile.image,
        "role": profile.role.as_str(),
    })
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect().await?;

    match cmd {
        UserCommands::Create { email, name, password, admin } => {
            let user = credentials::register(
                state.adapter.as_ref(),
                Registration { name, email, password },
                state.config.security.bcrypt_cost,
            )
            .await
            .context("failed to create user")?;

            let profile = if admin {
                let email = user.email.as_deref().unwrap_or_default();
                state.users.set_role(email, Role::Admin).await?
            } else {
                Profile::from(user)
            };

            output_details(&output_format, "User created", profile_json(&profile))
        }
        UserCommands::Show { email } => {
            let email = normalize_email(&email);
            let user = state
                .adapter
                .get_user_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("No user with email {}", email))?;

            output_details(&output_format, "User found", profile_json(&Profile::from(user)))
        }
        UserCommands::Delete { email } => {
            let email = normalize_email(&email);
            let user = state
                .adapter
                .get_user_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("No user with email {}", email))?;

            state.adapter.delete_user(user.id).await?;
            output_success(&output_format, &format!("User {} deleted", email), None)
        }
        UserCommands::Role { email, role } => {
            let profile = state.users.set_role(&email, role).await?;
            output_details(
                &output_format,
                &format!("Role set to {}", role),
                profile_json(&profile),
            )
        }
    }
}
