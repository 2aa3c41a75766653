//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STALLFRONT_AUTH_SECRET` - Session token signing secret (min 32 chars,
//!   high entropy)
//!
//! ## Optional
//! - `STALLFRONT_DATABASE_URL` - `SQLite` connection string
//!   (default: `sqlite:stallfront.db?mode=rwc`; generic `DATABASE_URL` also
//!   accepted)
//! - `STALLFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STALLFRONT_PORT` - Listen port (default: 3000)
//! - `STALLFRONT_BASE_URL` - Public URL, used to build image URLs
//!   (default: `http://localhost:3000`)
//! - `STALLFRONT_UPLOAD_DIR` - Directory for uploaded menu images
//!   (default: `uploads`)
//! - `STALLFRONT_COOKIE_SECURE` - Set the `Secure` flag on the session
//!   cookie (default: false; enable behind TLS)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_AUTH_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SQLite` database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, used when building uploaded-image URLs
    pub base_url: String,
    /// Session token signing secret
    pub auth_secret: SecretString,
    /// Directory where uploaded menu images are stored
    pub upload_dir: PathBuf,
    /// Whether the session cookie carries the `Secure` flag
    pub cookie_secure: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the auth secret fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STALLFRONT_DATABASE_URL");
        let host = get_env_or_default("STALLFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STALLFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STALLFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STALLFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_env_or_default("STALLFRONT_BASE_URL", "http://localhost:3000");
        let auth_secret = get_validated_secret("STALLFRONT_AUTH_SECRET")?;
        validate_auth_secret(&auth_secret, "STALLFRONT_AUTH_SECRET")?;
        let upload_dir = PathBuf::from(get_env_or_default("STALLFRONT_UPLOAD_DIR", "uploads"));
        let cookie_secure = get_env_or_default("STALLFRONT_COOKIE_SECURE", "false")
            .parse::<bool>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STALLFRONT_COOKIE_SECURE".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            auth_secret,
            upload_dir,
            cookie_secure,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`, then to a
/// local file database.
fn get_database_url(primary_key: &str) -> SecretString {
    if let Ok(value) = std::env::var(primary_key) {
        return SecretString::from(value);
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return SecretString::from(value);
    }
    SecretString::from("sqlite:stallfront.db?mode=rwc")
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the auth secret meets minimum length requirements.
fn validate_auth_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_AUTH_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_AUTH_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
