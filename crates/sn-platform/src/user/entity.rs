//! User entity

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{PlatformError, Result};
use crate::shared::validation::{validate_birth_date, validate_email, validate_person_name, validate_username};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Sex {
    M,
    F,
    O,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::M => "M",
            Sex::F => "F",
            Sex::O => "O",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "M" => Ok(Sex::M),
            "F" => Ok(Sex::F),
            "O" => Ok(Sex::O),
            other => Err(PlatformError::validation(format!("sex must be one of M, F, O (got '{}')", other))),
        }
    }
}

/// A registered user. Password material never leaves the auth and user
/// services, so it is not part of this record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    /// Bumped on every global credential invalidation.
    pub version: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub avatar_src: Option<String>,
}

/// Stored password material.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub password_hash: String,
    pub salt: String,
}

/// Sign-up input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
}

impl NewUser {
    /// Field checks except the password policy, which the password service owns.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_person_name("firstName", &self.first_name)?;
        validate_person_name("lastName", &self.last_name)?;
        validate_birth_date(self.birth_date, today)
    }
}

/// Profile edit.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
}

impl UserUpdate {
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_person_name("firstName", &self.first_name)?;
        validate_person_name("lastName", &self.last_name)?;
        validate_birth_date(self.birth_date, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            username: "u_1".into(),
            email: "u1@example.com".into(),
            password: "Aa11aaaa".into(),
            first_name: "U".into(),
            last_name: "One".into(),
            sex: Sex::M,
            birth_date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_sex_parsing() {
        assert_eq!("F".parse::<Sex>().unwrap(), Sex::F);
        assert!("X".parse::<Sex>().is_err());
        assert_eq!(Sex::O.to_string(), "O");
    }

    #[test]
    fn test_new_user_validation() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(new_user().validate(today).is_ok());

        let mut bad = new_user();
        bad.email = "nope".into();
        assert!(bad.validate(today).is_err());

        let mut bad = new_user();
        bad.first_name = " ".into();
        assert!(bad.validate(today).is_err());
    }
}
