//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "sonora.toml",
    "./config/config.toml",
    "/etc/sonora/config.toml",
];

type EnvSource = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env: EnvSource,
}

impl ConfigLoader {
    /// Create a new configuration loader reading the process environment
    pub fn new() -> Self {
        Self {
            config_path: None,
            env: Box::new(|key| env::var(key).ok()),
        }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
            ..Self::new()
        }
    }

    /// Replace the environment with a fixed set of variables.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Box::new(move |key| vars.get(key).cloned());
        self
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config)?;

        Ok(config)
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|v| !v.is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.var(key) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::EnvError(format!("{} has an invalid value: {}", key, raw))),
            None => Ok(None),
        }
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, falling back to search paths");
        }

        if let Some(path) = self.var("SONORA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        // HTTP
        if let Some(val) = self.var("API_LISTEN") {
            config.http.listen = val;
        }
        if let Some(val) = self.var("CORS_ORIGINS") {
            config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Internal services
        if let Some(val) = self.var("AUTH_CONNECT") {
            config.services.auth_connect = with_scheme(val);
        }
        if let Some(val) = self.var("SEARCH_CONNECT") {
            config.services.search_connect = with_scheme(val);
        }
        if let Some(val) = self.var("USER_CONNECT") {
            config.services.user_connect = with_scheme(val);
        }
        if let Some(val) = self.var("AUTH_LISTEN") {
            config.services.auth_listen = val;
        }
        if let Some(val) = self.var("SEARCH_LISTEN") {
            config.services.search_listen = val;
        }
        if let Some(val) = self.var("USER_LISTEN") {
            config.services.user_listen = val;
        }

        // Database
        if let Some(val) = self.var("DB_HOST") {
            config.database.host = val;
        }
        if let Some(port) = self.parsed("DB_PORT")? {
            config.database.port = port;
        }
        if let Some(val) = self.var("DB_USER") {
            config.database.user = val;
        }
        if let Some(val) = self.var("DB_NAME") {
            config.database.name = val;
        }
        if let Some(val) = self.var("DB_PASSWORD") {
            config.database.password = val;
        }
        if let Some(val) = self.var("DB_SSLMODE") {
            config.database.sslmode = val;
        }
        if let Some(apply) = self.parsed("DB_APPLY_SCHEMA")? {
            config.database.apply_schema = apply;
        }

        // Media
        if let Some(val) = self.var("MEDIA_PATH") {
            config.media.path = val;
        }
        if let Some(val) = self.var("AVATARS_FOLDER") {
            config.media.avatars_folder = val;
        }
        if let Some(val) = self.var("RECORDS_FOLDER") {
            config.media.records_folder = val;
        }
        if let Some(val) = self.var("PLAYLIST_COVERS_FOLDER") {
            config.media.playlist_covers_folder = val;
        }
        if let Some(val) = self.var("ALBUM_COVERS_FOLDER") {
            config.media.album_covers_folder = val;
        }
        if let Some(size) = self.parsed("MAX_UPLOAD_SIZE")? {
            config.media.max_upload_size = size;
        }

        // Auth
        if let Some(val) = self.var("SECRET") {
            config.auth.secret = val;
        }
        if let Some(secure) = self.parsed("SECURE_COOKIES")? {
            config.auth.secure_cookies = secure;
        }

        Ok(())
    }
}

/// Connect strings are accepted as bare `host:port`.
fn with_scheme(addr: String) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr
    } else {
        format!("http://{}", addr)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
