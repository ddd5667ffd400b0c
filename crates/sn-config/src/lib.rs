//! Sonora Configuration System
//!
//! TOML-based configuration with environment variable overrides. Every
//! binary (API server and the three internal services) loads the same
//! `AppConfig` and reads the sections it needs.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * KIB;

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub services: ServicesConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
}

/// Public HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `API_LISTEN`
    pub listen: String,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            read_timeout_secs: 10,
            write_timeout_secs: 10,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl HttpConfig {
    /// Deadline applied to a whole request: read plus write budget.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs + self.write_timeout_secs)
    }
}

/// Addresses of the internal RPC services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// `AUTH_CONNECT`
    pub auth_connect: String,
    /// `SEARCH_CONNECT`
    pub search_connect: String,
    /// `USER_CONNECT`
    pub user_connect: String,
    pub auth_listen: String,
    pub search_listen: String,
    pub user_listen: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            auth_connect: "http://127.0.0.1:8081".to_string(),
            search_connect: "http://127.0.0.1:8082".to_string(),
            user_connect: "http://127.0.0.1:8083".to_string(),
            auth_listen: "0.0.0.0:8081".to_string(),
            search_listen: "0.0.0.0:8082".to_string(),
            user_listen: "0.0.0.0:8083".to_string(),
        }
    }
}

/// PostgreSQL connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub name: String,
    pub password: String,
    /// One of disable, allow, prefer, require, verify-ca, verify-full
    pub sslmode: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Create missing tables from the bundled schema at startup
    pub apply_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            name: "sonora".to_string(),
            password: String::new(),
            sslmode: "disable".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            apply_schema: false,
        }
    }
}

/// Blob store layout and upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// `MEDIA_PATH`
    pub path: String,
    pub avatars_folder: String,
    pub records_folder: String,
    pub playlist_covers_folder: String,
    pub album_covers_folder: String,
    /// Cap for image uploads (avatars, covers)
    pub max_upload_size: usize,
    /// Cap for audio uploads
    pub max_record_size: usize,
    /// Cover used by tracks created without an album
    pub default_track_cover: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            path: "./media".to_string(),
            avatars_folder: "avatars".to_string(),
            records_folder: "records".to_string(),
            playlist_covers_folder: "playlist_covers".to_string(),
            album_covers_folder: "albums".to_string(),
            max_upload_size: 5 * MIB,
            max_record_size: 50 * MIB,
            default_track_cover: "albums/default.png".to_string(),
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `SECRET`
    pub secret: String,
    pub session_ttl_secs: u64,
    pub csrf_ttl_secs: u64,
    pub leeway_secs: u64,
    /// Mark cookies `Secure`
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            session_ttl_secs: 30 * 24 * 60 * 60,
            csrf_ttl_secs: 30 * 60,
            leeway_secs: 5,
            secure_cookies: false,
        }
    }
}

/// Feed composition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub items_per_kind: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { items_per_kind: 10 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject configurations no service can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.len() < 16 {
            return Err(ConfigError::ValidationError(
                "SECRET must be set and at least 16 bytes long".to_string(),
            ));
        }
        if self.media.max_upload_size == 0 || self.media.max_record_size == 0 {
            return Err(ConfigError::ValidationError(
                "upload size caps must be positive".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Sonora Configuration
# Environment variables override these settings

[http]
listen = "0.0.0.0:8080"
read_timeout_secs = 10
write_timeout_secs = 10
cors_origins = ["http://localhost:3000"]

[services]
auth_connect = "http://127.0.0.1:8081"
search_connect = "http://127.0.0.1:8082"
user_connect = "http://127.0.0.1:8083"
auth_listen = "0.0.0.0:8081"
search_listen = "0.0.0.0:8082"
user_listen = "0.0.0.0:8083"

[database]
host = "localhost"
port = 5432
user = "postgres"
name = "sonora"
password = ""
sslmode = "disable"
max_connections = 10
apply_schema = false

[media]
path = "./media"
avatars_folder = "avatars"
records_folder = "records"
playlist_covers_folder = "playlist_covers"
album_covers_folder = "albums"
max_upload_size = 5242880

[auth]
secret = ""
session_ttl_secs = 2592000
csrf_ttl_secs = 1800
leeway_secs = 5

[feed]
items_per_kind = 10
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.listen, "0.0.0.0:8080");
        assert_eq!(config.http.request_timeout(), Duration::from_secs(20));
        assert_eq!(config.media.max_upload_size, 5 * MIB);
        assert_eq!(config.media.playlist_covers_folder, "playlist_covers");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.csrf_ttl_secs, 1800);
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.services.search_connect, "http://127.0.0.1:8082");
        assert_eq!(config.feed.items_per_kind, 10);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str("[database]\nname = \"music\"\n").unwrap();
        assert_eq!(config.database.name, "music");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.media.records_folder, "records");
    }

    #[test]
    fn test_validate_requires_secret() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.auth.secret = "0123456789abcdef".to_string();
        assert!(config.validate().is_ok());

        config.media.max_upload_size = 0;
        assert!(config.validate().is_err());
    }
}
