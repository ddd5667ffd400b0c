//! Field validators shared by the domain records.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::shared::error::{PlatformError, Result};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_PERSON_NAME_LEN: usize = 50;

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{2,30}$").unwrap())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

pub fn validate_username(username: &str) -> Result<()> {
    if !username_pattern().is_match(username) {
        return Err(PlatformError::validation(
            "username must be 2-30 characters of letters, digits or underscore",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > 254 || !email_pattern().is_match(email) {
        return Err(PlatformError::validation("email is not a valid address"));
    }
    Ok(())
}

pub fn validate_person_name(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlatformError::validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > MAX_PERSON_NAME_LEN {
        return Err(PlatformError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_PERSON_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_birth_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    if date <= earliest || date > today {
        return Err(PlatformError::validation("birthDate is out of range"));
    }
    Ok(())
}

/// Display names of artists, albums, tracks and playlists.
pub fn validate_title(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlatformError::validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(PlatformError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_TITLE_LEN
        )));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => Err(PlatformError::validation(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        ))),
        _ => Ok(()),
    }
}

/// Collapse blank optional text to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("u").is_err());
        assert!(validate_username("u1").is_ok());
        assert!(validate_username("u_1").is_ok());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("u1@example.com").is_ok());
        assert!(validate_email("u1example.com").is_err());
        assert!(validate_email("u1@example").is_err());
    }

    #[test]
    fn test_birth_date_bounds() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert!(validate_birth_date(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(), today).is_ok());
        assert!(validate_birth_date(today, today).is_ok());
        assert!(validate_birth_date(today.succ_opt().unwrap(), today).is_err());
        assert!(validate_birth_date(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(), today).is_err());
    }

    #[test]
    fn test_title_and_description() {
        assert!(validate_title("name", "  ").is_err());
        assert!(validate_title("name", "p").is_ok());
        assert!(validate_title("name", &"x".repeat(101)).is_err());
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" a ".into())), Some("a".to_string()));
        assert_eq!(non_blank(None), None);
    }
}
