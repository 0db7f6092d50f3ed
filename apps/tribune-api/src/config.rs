//! Application configuration loaded from environment variables.
//!
//! Fail-fast: required variables must be present and valid or the process
//! exits with a clear message before binding a socket. Secrets are refused
//! at their insecure development defaults when running in production mode.

use std::env;
use thiserror::Error;

/// Default `SESSION_SECRET`, for development only.
pub const INSECURE_SESSION_SECRET: &str = "development-session-secret-change-in-production";

/// Shortest shared secret accepted in production mode.
const MIN_SECRET_LEN: usize = 16;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}")]
    MissingVar { var: String },

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Application environment mode.
///
/// Development allows insecure defaults with WARN logging; production
/// refuses startup on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    /// Parse the `APP_ENV` value, defaulting to development.
    #[must_use]
    pub fn from_env_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub app_env: AppEnvironment,
    pub database_url: String,

    /// Shared secret for the Connect handshake. Never logged.
    pub connect_secret: String,
    /// Secret signing the local session cookie. Never logged.
    pub session_secret: String,

    /// Base URL of the forum (e.g. `https://forum.example.com`).
    pub forum_base_url: String,
    pub forum_api_key: String,
    pub forum_api_username: String,

    /// Local login entry point the provider flow defers to.
    pub login_url: String,

    pub sync_enabled: bool,
    pub sync_timeout_secs: u64,
}

fn required(var: &str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar {
            var: var.to_string(),
        }),
    }
}

fn optional(var: &str, default: &str) -> String {
    env::var(var).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = optional("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: e.to_string(),
            })?;

        let sync_timeout_secs = optional("SYNC_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue {
                var: "SYNC_TIMEOUT_SECS".to_string(),
                message: e.to_string(),
            })?;

        let sync_enabled = match optional("SYNC_ENABLED", "true").as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue {
                    var: "SYNC_ENABLED".to_string(),
                    message: format!("expected true/false, got {other}"),
                })
            }
        };

        Ok(Self {
            host: optional("HOST", "0.0.0.0"),
            port,
            rust_log: optional("RUST_LOG", "info"),
            app_env: AppEnvironment::from_env_str(&optional("APP_ENV", "development")),
            database_url: required("DATABASE_URL")?,
            connect_secret: required("CONNECT_SECRET")?,
            session_secret: optional("SESSION_SECRET", INSECURE_SESSION_SECRET),
            forum_base_url: required("FORUM_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            forum_api_key: required("FORUM_API_KEY")?,
            forum_api_username: optional("FORUM_API_USERNAME", "system"),
            login_url: optional("LOGIN_URL", "/accounts/login/"),
            sync_enabled,
            sync_timeout_secs,
        })
    }

    /// Check secrets against insecure defaults.
    ///
    /// Returns warnings in development; errors in production, where the
    /// process must refuse to start.
    pub fn validate_security(&self) -> Result<Vec<String>, Vec<String>> {
        let mut findings = Vec::new();

        if self.session_secret == INSECURE_SESSION_SECRET {
            findings.push("SESSION_SECRET is the insecure development default".to_string());
        }
        if self.connect_secret.len() < MIN_SECRET_LEN {
            findings.push(format!(
                "CONNECT_SECRET is shorter than {MIN_SECRET_LEN} characters"
            ));
        }
        if self.session_secret.len() < MIN_SECRET_LEN {
            findings.push(format!(
                "SESSION_SECRET is shorter than {MIN_SECRET_LEN} characters"
            ));
        }

        if self.app_env.is_production() && !findings.is_empty() {
            Err(findings)
        } else {
            Ok(findings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
            app_env: AppEnvironment::Development,
            database_url: "postgres://localhost/tribune".to_string(),
            connect_secret: "d836444a9e4084d5b224a60c208dce14".to_string(),
            session_secret: "0f1e2d3c4b5a69788796a5b4c3d2e1f0".to_string(),
            forum_base_url: "https://forum.example.com".to_string(),
            forum_api_key: "key".to_string(),
            forum_api_username: "system".to_string(),
            login_url: "/accounts/login/".to_string(),
            sync_enabled: true,
            sync_timeout_secs: 10,
        }
    }

    #[test]
    fn test_app_env_parsing() {
        assert!(AppEnvironment::from_env_str("production").is_production());
        assert!(AppEnvironment::from_env_str("PROD").is_production());
        assert!(!AppEnvironment::from_env_str("development").is_production());
        assert!(!AppEnvironment::from_env_str("anything-else").is_production());
    }

    #[test]
    fn test_secure_config_passes() {
        assert!(config().validate_security().unwrap().is_empty());
    }

    #[test]
    fn test_default_session_secret_warns_in_development() {
        let mut c = config();
        c.session_secret = INSECURE_SESSION_SECRET.to_string();
        let warnings = c.validate_security().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_default_session_secret_refused_in_production() {
        let mut c = config();
        c.session_secret = INSECURE_SESSION_SECRET.to_string();
        c.app_env = AppEnvironment::Production;
        assert!(c.validate_security().is_err());
    }

    #[test]
    fn test_short_connect_secret_refused_in_production() {
        let mut c = config();
        c.connect_secret = "short".to_string();
        c.app_env = AppEnvironment::Production;
        let errors = c.validate_security().unwrap_err();
        assert!(errors[0].contains("CONNECT_SECRET"));
    }
}
