use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use quill_core::db::ReplicaConfig;
use quill_core::util::is_remote_database_url;
use thiserror::Error;

/// Shortest HS256 secret accepted for verifying access tokens.
const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub replica: Option<ReplicaConfig>,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub auth_clock_skew: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("replica", &self.replica)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "QUILL_API_BIND_ADDR", "127.0.0.1:8080");
        let database_path = value_or_default(&lookup, "QUILL_DATABASE_PATH", "quill.db");

        let replica = parse_replica_config(&lookup)?;
        if replica.is_some() && database_path == ":memory:" {
            return Err(ConfigError::Invalid(
                "QUILL_DATABASE_PATH must be a file when QUILL_DATABASE_URL is set".to_string(),
            ));
        }

        let jwt_secret = required_trimmed(&lookup, "AUTH_JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Invalid(format!(
                "AUTH_JWT_SECRET must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }
        let jwt_issuer = optional_trimmed(&lookup, "AUTH_JWT_ISSUER");
        let jwt_audience = optional_trimmed(&lookup, "AUTH_JWT_AUDIENCE");

        let auth_clock_skew_secs = value_or_default(&lookup, "AUTH_CLOCK_SKEW_SECS", "60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "AUTH_CLOCK_SKEW_SECS must be an integer in [0, 300]".to_string(),
                )
            })?;
        if auth_clock_skew_secs > 300 {
            return Err(ConfigError::Invalid(
                "AUTH_CLOCK_SKEW_SECS must be in [0, 300]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            database_path,
            replica,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
        })
    }
}

fn parse_replica_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<ReplicaConfig>, ConfigError> {
    let url = optional_trimmed(&lookup, "QUILL_DATABASE_URL");
    let auth_token = optional_trimmed(&lookup, "QUILL_DATABASE_AUTH_TOKEN");

    if url.is_none() && auth_token.is_none() {
        return Ok(None);
    }

    let url = url.ok_or(ConfigError::MissingVar("QUILL_DATABASE_URL"))?;
    let auth_token = auth_token.ok_or(ConfigError::MissingVar("QUILL_DATABASE_AUTH_TOKEN"))?;
    if !is_remote_database_url(&url) {
        return Err(ConfigError::Invalid(
            "QUILL_DATABASE_URL must start with libsql://, https:// or http://".to_string(),
        ));
    }

    Ok(Some(ReplicaConfig::new(url, auth_token)))
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        database_path: ":memory:".to_string(),
        replica: None,
        jwt_secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
        jwt_issuer: None,
        jwt_audience: None,
        auth_clock_skew: Duration::from_secs(60),
    }
}
