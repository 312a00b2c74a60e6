//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TECHMART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `TECHMART_HOST` - Bind address (default: 127.0.0.1)
//! - `TECHMART_PORT` - Listen port (default: 8080)
//! - `TECHMART_BASE_URL` - Public URL of this API (default: `http://localhost:8080`)
//! - `TECHMART_FRONTEND_URL` - Storefront URL used in emails and MoMo redirects
//! - `JWT_TTL_HOURS` - Token lifetime in hours (default: 24)
//! - `CORS_ALLOWED_ORIGINS` - Comma separated list of allowed origins
//! - `GOOGLE_CLIENT_ID` - Enables Google sign-in
//! - `MOMO_PARTNER_CODE`, `MOMO_ACCESS_KEY`, `MOMO_SECRET_KEY` - Enable MoMo checkout
//! - `MOMO_ENDPOINT` - MoMo create endpoint (default: sandbox)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Enable email
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MOMO_ENDPOINT: &str = "https://test-payment.momo.vn/v2/gateway/api/create";

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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API (used for the MoMo IPN callback)
    pub base_url: String,
    /// Storefront URL (password reset links, MoMo redirect)
    pub frontend_url: String,
    /// JWT signing configuration
    pub jwt: JwtConfig,
    /// Origins allowed by CORS; empty means same-origin only
    pub cors_allowed_origins: Vec<String>,
    /// Google OAuth client ID; `None` disables Google sign-in
    pub google_client_id: Option<String>,
    /// MoMo credentials; `None` disables MoMo checkout
    pub momo: Option<MomoConfig>,
    /// SMTP settings; `None` logs emails instead of sending them
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Share of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Share of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// JWT signing configuration.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret for HS256
    pub secret: SecretString,
    /// Token lifetime in hours
    pub ttl_hours: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

/// MoMo e-wallet gateway credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: SecretString,
    pub secret_key: SecretString,
    /// Create-payment endpoint
    pub endpoint: String,
}

impl std::fmt::Debug for MomoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MomoConfig")
            .field("partner_code", &self.partner_code)
            .field("access_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// SMTP email configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
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

        let database_url = get_database_url("TECHMART_DATABASE_URL")?;
        let host = get_env_or_default("TECHMART_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TECHMART_HOST".to_string(), e.to_string()))?;
        let port = parse_env("TECHMART_PORT", "8080")?;
        let base_url = get_env_or_default("TECHMART_BASE_URL", "http://localhost:8080");
        let frontend_url = get_env_or_default("TECHMART_FRONTEND_URL", "http://localhost:3000");
        validate_url(&base_url, "TECHMART_BASE_URL")?;
        validate_url(&frontend_url, "TECHMART_FRONTEND_URL")?;

        let jwt = JwtConfig::from_env()?;
        let cors_allowed_origins = parse_list(&get_env_or_default("CORS_ALLOWED_ORIGINS", ""));
        let google_client_id = get_optional_env("GOOGLE_CLIENT_ID");
        let momo = MomoConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            frontend_url,
            jwt,
            cors_allowed_origins,
            google_client_id,
            momo,
            email,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("JWT_SECRET")?;
        validate_jwt_secret(&secret, "JWT_SECRET")?;
        let ttl_hours: i64 = parse_env("JWT_TTL_HOURS", "24")?;
        if ttl_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_TTL_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }
        Ok(Self { secret, ttl_hours })
    }
}

impl MomoConfig {
    /// All three credentials or none of them.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(partner_code) = get_optional_env("MOMO_PARTNER_CODE") else {
            return Ok(None);
        };
        let endpoint = get_env_or_default("MOMO_ENDPOINT", DEFAULT_MOMO_ENDPOINT);
        validate_url(&endpoint, "MOMO_ENDPOINT")?;
        Ok(Some(Self {
            partner_code,
            access_key: get_required_secret("MOMO_ACCESS_KEY")?,
            secret_key: get_required_secret("MOMO_SECRET_KEY")?,
            endpoint,
        }))
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn validate_url(value: &str, var_name: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))
}

/// Validate that the JWT secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
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
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Configuration used by router tests; no external services enabled.
    pub(crate) fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/techmart_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            jwt: JwtConfig {
                secret: SecretString::from("k9V#r2Lp!x7QzT4m@W8yB1nC6dF3hJ5s"),
                ttl_hours: 24,
            },
            cors_allowed_origins: Vec::new(),
            google_client_id: None,
            momo: None,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-jwt-secret-here", "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "JWT_SECRET");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_length() {
        assert!(validate_jwt_secret(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_jwt_secret(&SecretString::from("a".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" https://techmart.vn, ,http://localhost:3000 "),
            vec!["https://techmart.vn", "http://localhost:3000"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let momo = MomoConfig {
            partner_code: "MOMOTEST".to_string(),
            access_key: SecretString::from("access_value_123"),
            secret_key: SecretString::from("secret_value_456"),
            endpoint: DEFAULT_MOMO_ENDPOINT.to_string(),
        };
        let output = format!("{momo:?}");
        assert!(output.contains("MOMOTEST"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("access_value_123"));
        assert!(!output.contains("secret_value_456"));

        let jwt_output = format!("{:?}", test_config().jwt);
        assert!(!jwt_output.contains("k9V#r2Lp"));
    }
}
