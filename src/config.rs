//! Application configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.

use chrono::Duration;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Global configuration instance.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Path to the users JSON file.
    pub users_file: PathBuf,
    /// Path to the credential records JSON file.
    pub auth_users_file: PathBuf,
    /// Secret key for signing tokens.
    pub jwt_secret: String,
    /// Whether `jwt_secret` was generated because none was configured.
    pub jwt_secret_generated: bool,
    /// Access token lifetime in minutes.
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in days.
    pub refresh_token_ttl_days: i64,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json or pretty).
    pub log_format: LogFormat,
    /// Allowed CORS origins (comma-separated, or * for all).
    pub cors_origins: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON structured logging for production.
    Json,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse_var("PORT", var("PORT", "8080"))?;

        let users_file = PathBuf::from(var("USERS_FILE", "./data/users.json"));
        let auth_users_file = PathBuf::from(var("AUTH_USERS_FILE", "./data/auth_users.json"));

        let (jwt_secret, jwt_secret_generated) = match lookup("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (uuid::Uuid::new_v4().to_string(), true),
        };

        let access_token_ttl_minutes =
            parse_var("ACCESS_TOKEN_TTL_MINUTES", var("ACCESS_TOKEN_TTL_MINUTES", "30"))?;
        let refresh_token_ttl_days =
            parse_var("REFRESH_TOKEN_TTL_DAYS", var("REFRESH_TOKEN_TTL_DAYS", "30"))?;

        let log_level = var("LOG_LEVEL", "info");

        let log_format = match var("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            users_file,
            auth_users_file,
            jwt_secret,
            jwt_secret_generated,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
            log_level,
            log_format,
            cors_origins,
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret_generated {
            tracing::warn!(
                "JWT_SECRET not set, using random secret. Tokens will be invalidated on restart!"
            );
        } else if self.jwt_secret.len() < 32 {
            tracing::warn!(
                "JWT_SECRET is shorter than 32 characters. Consider using a longer secret."
            );
        }

        if self.access_token_ttl_minutes <= 0 {
            return Err(ConfigError::NonPositiveTtl("ACCESS_TOKEN_TTL_MINUTES"));
        }
        if self.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::NonPositiveTtl("REFRESH_TOKEN_TTL_DAYS"));
        }

        // Ensure data file parent directories exist
        for file in [&self.users_file, &self.auth_users_file] {
            if let Some(parent) = file.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConfigError::DataDirectoryCreationFailed(parent.display().to_string(), e)
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_ttl_minutes)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key, value))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: '{1}'")]
    InvalidValue(&'static str, String),

    #[error("{0} must be greater than zero")]
    NonPositiveTtl(&'static str),

    #[error("Failed to create data directory '{0}': {1}")]
    DataDirectoryCreationFailed(String, std::io::Error),
}

/// Initialize the global configuration.
///
/// Should be called once at application startup.
pub fn init() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

/// Get the global configuration, if it has been initialized.
pub fn get() -> Option<&'static Config> {
    CONFIG.get()
}
