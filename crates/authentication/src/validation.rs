use app_config::PasswordConfig;
use app_error::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Local part of letters, digits and _+.- (no leading/trailing dot), then a dotted domain
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-z0-9_+]([a-z0-9_+.\-]*[a-z0-9_+])?@[a-z0-9]+([\-.][a-z0-9]+)*\.[a-z]{2,}$"
    ).unwrap();

    // Alphanumeric characters, underscores, and hyphens, 3-30 characters
    static ref USERNAME_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9_-]{3,30}$"
    ).unwrap();
}

const SPECIAL_CHARACTERS: &str = "@$!%*?&#^-_+=.,:;";

/// Validates a username
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::validation("username", "Username cannot be empty"));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(AppError::validation(
            "username",
            "Username must be 3-30 characters long and can only contain letters, numbers, underscores, and hyphens",
        ));
    }

    Ok(())
}

/// Validates an email address (expects it already lowercased)
pub fn validate_email(email: &str) -> AppResult<()> {
    if email.trim().is_empty() {
        return Err(AppError::validation("email", "Email cannot be empty"));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(AppError::validation("email", "Invalid email format"));
    }

    Ok(())
}

/// Validates a password against the configured policy
pub fn validate_password(password: &str, policy: &PasswordConfig) -> AppResult<()> {
    if password.trim().is_empty() {
        return Err(AppError::validation("password", "Password cannot be empty"));
    }

    if password.chars().count() < policy.min_length {
        return Err(AppError::validation(
            "password",
            &format!("Password must be at least {} characters long", policy.min_length),
        ));
    }

    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

    let mut missing = Vec::new();

    if policy.require_lowercase && !has_lowercase {
        missing.push("lowercase letter".to_string());
    }

    if policy.require_uppercase && !has_uppercase {
        missing.push("uppercase letter".to_string());
    }

    if policy.require_number && !has_digit {
        missing.push("number".to_string());
    }

    if policy.require_special && !has_special {
        missing.push(format!("special character ({})", SPECIAL_CHARACTERS));
    }

    if !missing.is_empty() {
        return Err(AppError::validation(
            "password",
            &format!("Password must contain at least one {}", missing.join(", one ")),
        ));
    }

    Ok(())
}

/// Login only checks presence; the policy is not revealed to anonymous callers.
pub fn validate_login(identifier: Option<&str>, password: &str) -> AppResult<String> {
    let identifier = identifier
        .ok_or_else(|| AppError::validation("username", "Username or email is required"))?;

    if password.is_empty() {
        return Err(AppError::validation("password", "Password is required"));
    }

    Ok(identifier.to_string())
}

/// Sanitizes a string input by trimming whitespace
pub fn sanitize_string(input: &str) -> String {
    input.trim().to_string()
}
