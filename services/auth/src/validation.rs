//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Longest accepted API key label
pub const MAX_KEY_NAME_LEN: usize = 100;

/// Longest accepted key lifetime, in days
pub const MAX_EXPIRES_IN_DAYS: i64 = 3650;

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

/// Validate password: 6 to 128 characters with upper, lower and digit
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.chars().count() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_upper && has_lower && has_digit) {
        return Err(
            "Password must contain an uppercase letter, a lowercase letter and a digit"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate an optional API key label
pub fn validate_api_key_name(name: Option<&str>) -> Result<(), String> {
    match name {
        Some(name) if name.trim().is_empty() => Err("API key name cannot be blank".to_string()),
        Some(name) if name.chars().count() > MAX_KEY_NAME_LEN => Err(format!(
            "API key name must be at most {} characters long",
            MAX_KEY_NAME_LEN
        )),
        _ => Ok(()),
    }
}

/// Validate an optional key lifetime
pub fn validate_expires_in_days(days: Option<i64>) -> Result<(), String> {
    match days {
        Some(days) if !(1..=MAX_EXPIRES_IN_DAYS).contains(&days) => Err(format!(
            "expires_in_days must be between 1 and {}",
            MAX_EXPIRES_IN_DAYS
        )),
        _ => Ok(()),
    }
}
