use anyhow::Context;
use serde_json::{json, Value};

use crate::auth::Role;
use crate::cli::OutputFormat;
use crate::config::{self, AppConfig};
use crate::state::AppState;

/// Output a success message in the appropriate format; `data` fields are
/// merged into the JSON object
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print key/value details under a success line in text mode
pub fn output_details(output_format: &OutputFormat, message: &str, details: Value) -> anyhow::Result<()> {
    output_success(output_format, message, Some(details.clone()))?;

    if *output_format == OutputFormat::Text {
        if let Value::Object(fields) = details {
            for (key, value) in fields {
                match value {
                    Value::String(s) => println!("  {}: {}", key, s),
                    Value::Null => println!("  {}: -", key),
                    other => println!("  {}: {}", key, other),
                }
            }
        }
    }
    Ok(())
}

/// Configuration for one-off commands, validated the same way as the server
pub fn load_config() -> anyhow::Result<AppConfig> {
    let config = config::config().clone();
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

pub async fn connect() -> anyhow::Result<AppState> {
    let config = load_config()?;
    AppState::from_config(config).await
}

/// Strict role parser for arguments; unlike stored values, typos are errors here
pub fn parse_role(value: &str) -> Result<Role, String> {
    match value.to_ascii_uppercase().as_str() {
        "ADMIN" => Ok(Role::Admin),
        "USER" => Ok(Role::User),
        _ => Err(format!("unknown role '{}', expected ADMIN or USER", value)),
    }
}
