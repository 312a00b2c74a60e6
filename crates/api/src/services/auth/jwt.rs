//! HS256 access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use techmart_core::UserId;

use super::AuthError;
use crate::config::JwtConfig;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.encode(&claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign access token");
            AuthError::TokenSigning
        })
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for an expired token and
    /// `AuthError::InvalidToken` for anything else that fails validation.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Token lifetime in seconds, reported to clients.
    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: SecretString::from(secret.to_owned()),
            ttl_hours: 24,
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys("k9V#r2Lp!x7QzT4m@W8yB1nC6dF3hJ5s");
        let token = keys.issue(UserId::new(42)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id, UserId::new(42));
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_foreign_token_rejected() {
        let token = keys("k9V#r2Lp!x7QzT4m@W8yB1nC6dF3hJ5s")
            .issue(UserId::new(1))
            .unwrap();
        let other = keys("Zq8!mW3r#Tb6xL1p@Vn9cK4y$Hd7gF2j");
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(other.verify("garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys("k9V#r2Lp!x7QzT4m@W8yB1nC6dF3hJ5s");
        let now = Utc::now().timestamp();
        let token = keys
            .encode(&Claims {
                user_id: UserId::new(1),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::TokenExpired)));
    }
}
