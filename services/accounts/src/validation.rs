//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Longest accepted display field (names, titles, avatar URLs)
pub const MAX_DISPLAY_FIELD_LENGTH: usize = 255;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a free-form display field
pub fn validate_display_field(label: &str, value: &str) -> Result<(), String> {
    if value.chars().count() > MAX_DISPLAY_FIELD_LENGTH {
        return Err(format!(
            "{} must be at most {} characters long",
            label, MAX_DISPLAY_FIELD_LENGTH
        ));
    }

    if value.chars().any(char::is_control) {
        return Err(format!("{} contains invalid characters", label));
    }

    Ok(())
}

/// Validate that a field is not blank
pub fn validate_required(label: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }

    Ok(())
}
