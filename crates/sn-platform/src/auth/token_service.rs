//! Token Service
//!
//! Issues and verifies the two short-lived HS256 credentials the API uses:
//! session tokens (user id + user version) and anti-forgery tokens. The two
//! claim sets carry different fields and a `typ` marker, so one can never be
//! accepted in place of the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::shared::error::{PlatformError, Result};

const SESSION_TYPE: &str = "session";
const ANTI_FORGERY_TYPE: &str = "csrf";

/// Claims of a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: i64,
    /// User version at issuance
    pub ver: i64,
    pub iat: i64,
    pub exp: i64,
    pub typ: String,
}

/// Claims of an anti-forgery token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiForgeryClaims {
    pub csrf_uid: i64,
    pub iat: i64,
    pub exp: i64,
    pub typ: String,
}

/// Identity carried by a verified session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: i64,
    pub version: i64,
}

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC secret shared by every API instance
    pub secret: String,
    pub session_ttl: Duration,
    pub anti_forgery_ttl: Duration,
    /// Clock-skew tolerance in seconds
    pub leeway_secs: u64,
}

impl TokenConfig {
    pub fn from_app_config(config: &sn_config::AuthConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            session_ttl: Duration::seconds(config.session_ttl_secs as i64),
            anti_forgery_ttl: Duration::seconds(config.csrf_ttl_secs as i64),
            leeway_secs: config.leeway_secs,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            session_ttl: Duration::days(30),
            anti_forgery_ttl: Duration::minutes(30),
            leeway_secs: 5,
        }
    }
}

pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        info!(
            session_ttl_secs = config.session_ttl.num_seconds(),
            anti_forgery_ttl_secs = config.anti_forgery_ttl.num_seconds(),
            "TokenService initialized with HS256"
        );

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.config.session_ttl
    }

    pub fn anti_forgery_ttl(&self) -> Duration {
        self.config.anti_forgery_ttl
    }

    pub fn issue_session(&self, user_id: i64, version: i64) -> Result<String> {
        self.session_at(user_id, version, Utc::now())
    }

    fn session_at(&self, user_id: i64, version: i64, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = SessionClaims {
            sub: user_id,
            ver: version,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.config.session_ttl).timestamp(),
            typ: SESSION_TYPE.to_string(),
        };
        self.sign(&claims)
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionIdentity> {
        let claims: SessionClaims = self.verify(token)?;
        if claims.typ != SESSION_TYPE {
            return Err(PlatformError::InvalidCredential);
        }
        Ok(SessionIdentity {
            user_id: claims.sub,
            version: claims.ver,
        })
    }

    pub fn issue_anti_forgery(&self, user_id: i64) -> Result<String> {
        self.anti_forgery_at(user_id, Utc::now())
    }

    fn anti_forgery_at(&self, user_id: i64, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = AntiForgeryClaims {
            csrf_uid: user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.config.anti_forgery_ttl).timestamp(),
            typ: ANTI_FORGERY_TYPE.to_string(),
        };
        self.sign(&claims)
    }

    /// Returns the user id the token was issued for.
    pub fn verify_anti_forgery(&self, token: &str) -> Result<i64> {
        let claims: AntiForgeryClaims = self.verify(token)?;
        if claims.typ != ANTI_FORGERY_TYPE {
            return Err(PlatformError::InvalidCredential);
        }
        Ok(claims.csrf_uid)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to sign token: {}", e)))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        // Only HS256 is accepted; tokens declaring any other algorithm fail.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.leeway_secs;
        validation.set_required_spec_claims(&["exp", "iat"]);

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                PlatformError::InvalidCredential
            })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TokenConfig {
            secret: "test-secret-with-enough-bytes".to_string(),
            ..TokenConfig::default()
        })
    }

    #[test]
    fn test_session_round_trip() {
        let service = service();
        let token = service.issue_session(42, 3).unwrap();
        let identity = service.verify_session(&token).unwrap();
        assert_eq!(identity, SessionIdentity { user_id: 42, version: 3 });
    }

    #[test]
    fn test_anti_forgery_round_trip() {
        let service = service();
        let token = service.issue_anti_forgery(7).unwrap();
        assert_eq!(service.verify_anti_forgery(&token).unwrap(), 7);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let service = service();
        let session = service.issue_session(1, 1).unwrap();
        let csrf = service.issue_anti_forgery(1).unwrap();

        assert!(matches!(service.verify_anti_forgery(&session), Err(PlatformError::InvalidCredential)));
        assert!(matches!(service.verify_session(&csrf), Err(PlatformError::InvalidCredential)));
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let service = service();
        let issued = Utc::now() - Duration::days(31);
        let token = service.session_at(1, 1, issued).unwrap();
        assert!(matches!(service.verify_session(&token), Err(PlatformError::InvalidCredential)));
    }

    #[test]
    fn test_expired_anti_forgery_is_rejected() {
        let service = service();
        let issued = Utc::now() - Duration::minutes(31);
        let token = service.anti_forgery_at(1, issued).unwrap();
        assert!(service.verify_anti_forgery(&token).is_err());
    }

    #[test]
    fn test_clock_skew_within_leeway_is_tolerated() {
        let service = service();
        // Expired two seconds ago, leeway is five.
        let issued = Utc::now() - Duration::days(30) - Duration::seconds(2);
        let token = service.session_at(9, 1, issued).unwrap();
        assert_eq!(service.verify_session(&token).unwrap().user_id, 9);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = service().issue_session(1, 1).unwrap();
        let other = TokenService::new(TokenConfig {
            secret: "another-secret-entirely".to_string(),
            ..TokenConfig::default()
        });
        assert!(other.verify_session(&token).is_err());
    }

    #[test]
    fn test_other_algorithms_are_rejected() {
        let claims = SessionClaims {
            sub: 1,
            ver: 1,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::days(1)).timestamp(),
            typ: SESSION_TYPE.to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret-with-enough-bytes"),
        )
        .unwrap();

        assert!(service().verify_session(&token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let service = service();
        let mut token = service.issue_session(1, 1).unwrap();
        token.push('x');
        assert!(service.verify_session(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), None);
        assert_eq!(extract_bearer_token("Bearer  "), Some(" "));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc123"), None);
    }
}
