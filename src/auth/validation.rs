//! Input rules shared by registration and profile editing. Each check returns
//! the normalized value or a message suitable for showing next to a form field.

pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 8;
// bcrypt ignores input past 72 bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Trim and check a display name; length is counted in characters
pub fn validate_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();

    if length < MIN_NAME_LENGTH {
        return Err(format!("Name must be at least {} characters", MIN_NAME_LENGTH));
    }
    if length > MAX_NAME_LENGTH {
        return Err(format!("Name must be at most {} characters", MAX_NAME_LENGTH));
    }
    Ok(trimmed.to_string())
}

pub fn validate_email_format(email: &str) -> Result<String, String> {
    let email = crate::database::models::user::normalize_email(email);
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err("Invalid email format".to_string());
    }
    let domain = parts[1];
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        ));
    }
    Ok(())
}

/// Profile images must be absolute http(s) URLs
pub fn validate_image_url(image: &str) -> Result<String, String> {
    let parsed = url::Url::parse(image.trim()).map_err(|_| "Image must be a valid URL".to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        _ => Err("Image URL must use http or https".to_string()),
    }
}
