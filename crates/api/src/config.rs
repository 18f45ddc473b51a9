//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOOKSHOP_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `BOOKSHOP_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL`. Only required when storage is `postgres`.
//!
//! ## Optional
//! - `BOOKSHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `BOOKSHOP_PORT` - Listen port (default: 8000)
//! - `BOOKSHOP_STORAGE` - `postgres` (default) or `memory`
//! - `BOOKSHOP_ACCESS_TOKEN_MINUTES` - Access token lifetime (default: 60)
//! - `BOOKSHOP_REFRESH_TOKEN_DAYS` - Refresh token lifetime (default: 1)
//! - `BOOKSHOP_MEDIA_DIR` - Where uploaded covers are written (default: media)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

/// Shortest signing secret accepted.
const MIN_SECRET_CHARS: usize = 32;

/// Below this many bits of Shannon entropy per character a secret is
/// considered hand-typed.
const MIN_SECRET_ENTROPY: f64 = 3.3;

/// Fragments that show up in sample `.env` files and docs.
const SAMPLE_SECRET_MARKERS: &[&str] = &[
    "changeme",
    "change-me",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "your-",
    "insert",
    "todo",
    "xxxx",
    "1234",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which storage backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        })
    }
}

/// Token signing settings.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .finish()
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub storage: StorageBackend,
    pub jwt: JwtConfig,
    /// Root directory for uploaded images, served under `/media`
    pub media_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = parse_env("BOOKSHOP_STORAGE", StorageBackend::Postgres)?;
        let database_url = match storage {
            StorageBackend::Postgres => Some(get_database_url("BOOKSHOP_DATABASE_URL")?),
            StorageBackend::Memory => get_optional_database_url("BOOKSHOP_DATABASE_URL"),
        };

        let host = parse_env("BOOKSHOP_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_env("BOOKSHOP_PORT", 8000_u16)?;

        let secret = signing_secret("BOOKSHOP_JWT_SECRET")?;
        let jwt = JwtConfig {
            secret,
            access_token_minutes: parse_positive("BOOKSHOP_ACCESS_TOKEN_MINUTES", 60)?,
            refresh_token_days: parse_positive("BOOKSHOP_REFRESH_TOKEN_DAYS", 1)?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            storage,
            jwt,
            media_dir: PathBuf::from(get_env_or_default("BOOKSHOP_MEDIA_DIR", "media")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Database URL from `primary_key`, or the generic `DATABASE_URL` set by most hosts.
fn get_optional_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Database URL with the same `DATABASE_URL` fallback, required.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` if neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    get_optional_database_url(primary_key)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// A set, non-blank variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_positive(key: &str, default: i64) -> Result<i64, ConfigError> {
    match parse_env(key, default)? {
        value if value > 0 => Ok(value),
        value => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be positive (got {value})"),
        )),
    }
}

/// Read the token signing secret and refuse anything guessable.
fn signing_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))?;
    check_secret(&value).map_err(|reason| ConfigError::InsecureSecret(key.to_string(), reason))?;
    Ok(SecretString::from(value))
}

/// Length, sample-value and entropy checks. Returns the reason on failure.
fn check_secret(secret: &str) -> Result<(), String> {
    let chars = secret.chars().count();
    if chars < MIN_SECRET_CHARS {
        return Err(format!(
            "must be at least {MIN_SECRET_CHARS} characters (got {chars})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(marker) = SAMPLE_SECRET_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(format!("looks like a sample value (contains '{marker}')"));
    }

    let entropy = entropy_per_char(secret);
    if entropy < MIN_SECRET_ENTROPY {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need {MIN_SECRET_ENTROPY:.1}); generate it randomly"
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
#[allow(clippy::cast_precision_loss)]
fn entropy_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total = counts.values().sum::<u32>() as f64;
    counts
        .values()
        .map(|&n| f64::from(n) / total)
        .map(|p| -p * p.log2())
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_per_char() {
        assert!(entropy_per_char("").abs() < f64::EPSILON);
        assert!(entropy_per_char("zzzzzz").abs() < f64::EPSILON);
        assert!((entropy_per_char("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_check_secret() {
        assert!(check_secret("tooshort").unwrap_err().contains("at least 32"));
        assert!(
            check_secret("please-changeme-before-deploying-this-thing")
                .unwrap_err()
                .contains("changeme")
        );
        assert!(check_secret(&"qz".repeat(20)).unwrap_err().contains("entropy"));
        assert!(check_secret("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%").is_ok());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!(
            " Postgres ".parse::<StorageBackend>(),
            Ok(StorageBackend::Postgres)
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
        assert_eq!(StorageBackend::default().to_string(), "postgres");
    }

    #[test]
    fn test_socket_addr_and_redaction() {
        let config = ApiConfig {
            database_url: None,
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            storage: StorageBackend::Memory,
            jwt: JwtConfig {
                secret: SecretString::from("super_secret_signing_value"),
                access_token_minutes: 60,
                refresh_token_days: 1,
            },
            media_dir: PathBuf::from("media"),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_signing_value"));
    }
}
