//! Password hashing with Argon2id and a per-user salt.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::{debug, warn};

use crate::shared::error::{PlatformError, Result};
use crate::user::entity::Credentials;

/// Password policy configuration
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 64,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
        }
    }
}

impl PasswordPolicy {
    /// Validate a password against the policy
    pub fn validate(&self, password: &str) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let length = password.chars().count();

        if length < self.min_length {
            errors.push(format!("Password must be at least {} characters", self.min_length));
        }
        if length > self.max_length {
            errors.push(format!("Password must be at most {} characters", self.max_length));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push("Password must contain at least one uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push("Password must contain at least one lowercase letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one digit".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Argon2id configuration
#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// Memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
            output_len: 32,
        }
    }
}

impl Argon2Config {
    /// Low memory config for tests
    pub fn testing() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: 32,
        }
    }

    fn to_params(&self) -> Result<Params> {
        Params::new(self.memory_cost, self.time_cost, self.parallelism, Some(self.output_len))
            .map_err(|e| PlatformError::internal(format!("Invalid Argon2 params: {}", e)))
    }
}

pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
}

impl PasswordService {
    pub fn new(config: Argon2Config, policy: PasswordPolicy) -> Result<Self> {
        let params = config.to_params()?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        Ok(Self { argon2, policy })
    }

    /// Validate against the policy, then hash with a fresh salt.
    pub fn hash_password(&self, password: &str) -> Result<Credentials> {
        self.validate_password(password)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PlatformError::internal(format!("Failed to hash password: {}", e)))?;

        debug!("Password hashed");
        Ok(Credentials {
            password_hash: hash.to_string(),
            salt: salt.as_str().to_string(),
        })
    }

    pub fn verify_password(&self, password: &str, credentials: &Credentials) -> Result<bool> {
        let parsed = PasswordHash::new(&credentials.password_hash)
            .map_err(|e| PlatformError::internal(format!("Invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                warn!("Password verification failed");
                Ok(false)
            }
            Err(e) => Err(PlatformError::internal(format!("Password verification error: {}", e))),
        }
    }

    pub fn validate_password(&self, password: &str) -> Result<()> {
        self.policy
            .validate(password)
            .map_err(|errors| PlatformError::validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PasswordService {
        PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap()
    }

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate("Aa11aaaa").is_ok());
        assert!(policy.validate("Aa1aaaa").is_err());
        assert!(policy.validate("aa11aaaa").is_err());
        assert!(policy.validate("AA11AAAA").is_err());
        assert!(policy.validate("Aaaaaaaa").is_err());
        assert!(policy.validate(&format!("Aa1{}", "a".repeat(62))).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let service = service();
        let credentials = service.hash_password("Aa11aaaa").unwrap();

        assert!(credentials.password_hash.starts_with("$argon2id$"));
        assert!(credentials.password_hash.contains(&credentials.salt));
        assert!(service.verify_password("Aa11aaaa", &credentials).unwrap());
        assert!(!service.verify_password("Aa11aaab", &credentials).unwrap());
    }

    #[test]
    fn test_salts_are_per_hash() {
        let service = service();
        let first = service.hash_password("Aa11aaaa").unwrap();
        let second = service.hash_password("Aa11aaaa").unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.password_hash, second.password_hash);
    }

    #[test]
    fn test_policy_violation_is_validation_error() {
        assert!(matches!(
            service().hash_password("short"),
            Err(PlatformError::Validation { .. })
        ));
    }
}
