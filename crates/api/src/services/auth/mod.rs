//! Authentication service.
//!
//! Password accounts, Google sign-in, bearer tokens and password resets.

mod error;
pub mod google;
pub mod jwt;
pub mod password;

pub use error::AuthError;
pub use google::{GoogleIdentity, GoogleVerifier};
pub use jwt::{Claims, JwtKeys};

use chrono::{Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use techmart_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;
use password::{hash_password, validate_password, verify_password};

/// How long a password reset link stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// A signed-in user and their access token.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

/// Fields accepted at registration.
#[derive(Debug)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone: Option<&'a str>,
}

/// A freshly issued reset token, to be emailed to the user.
#[derive(Debug)]
pub struct ResetTicket {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    keys: &'a JwtKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, keys: &'a JwtKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            keys,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new customer and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: &Registration<'_>) -> Result<AuthSession, AuthError> {
        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;
        let password_hash = hash_password(registration.password)?;

        let user = self
            .users
            .create(&NewUser {
                name: registration.name.trim(),
                email: &email,
                phone: registration.phone,
                password_hash: Some(&password_hash),
                google_id: None,
                avatar_url: None,
                role: UserRole::Customer,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if staff disabled the account.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        self.session(user)
    }

    /// Sign in with a verified Google identity.
    ///
    /// Matches an account by Google subject first, then by email (linking
    /// the subject), and otherwise creates a new customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountDisabled` if the matched account is disabled.
    pub async fn login_with_google(
        &self,
        identity: &GoogleIdentity,
    ) -> Result<AuthSession, AuthError> {
        if let Some(user) = self.users.get_by_google_id(&identity.subject).await? {
            return self.active_session(user);
        }

        let email = Email::parse(&identity.email)?;
        if let Some(user) = self.users.get_by_email(&email).await? {
            let user = self
                .users
                .link_google(user.id, &identity.subject, identity.picture.as_deref())
                .await?;
            tracing::info!(user_id = %user.id, "Linked Google account");
            return self.active_session(user);
        }

        let fallback_name = email.local_part().to_owned();
        let user = self
            .users
            .create(&NewUser {
                name: identity.name.as_deref().unwrap_or(&fallback_name),
                email: &email,
                phone: None,
                password_hash: None,
                google_id: Some(&identity.subject),
                avatar_url: identity.picture.as_deref(),
                role: UserRole::Customer,
            })
            .await?;
        tracing::info!(user_id = %user.id, "User registered with Google");
        self.session(user)
    }

    /// Change the password of a signed-in user.
    ///
    /// Accounts created through Google have no current password and may set
    /// one without it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is wrong.
    /// Returns `AuthError::WeakPassword` if the new password is too weak.
    pub async fn change_password(
        &self,
        user: &User,
        current: Option<&str>,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if let Some(hash) = user.password_hash.as_deref() {
            verify_password(current.unwrap_or_default(), hash)?;
        }
        validate_password(new_password)?;
        let hash = hash_password(new_password)?;
        self.users.set_password(user.id, &hash).await?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Issue a reset token if an active account uses this email.
    ///
    /// Returns `None` for unknown addresses so callers can answer the same
    /// way either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    pub async fn forgot_password(&self, email: &str) -> Result<Option<ResetTicket>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self
            .users
            .get_by_email(&email)
            .await?
            .filter(|u| u.is_active)
        else {
            return Ok(None);
        };

        let token = hex::encode(rand::random::<[u8; 32]>());
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .create_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;

        Ok(Some(ResetTicket { user, token }))
    }

    /// Set a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password is too weak.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, used
    /// or expired.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let hash = hash_password(new_password)?;

        let user_id = self
            .users
            .reset_password(&hash_token(token.trim()), &hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidResetToken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Resolve a bearer token to an active user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken`/`TokenExpired` for bad tokens and
    /// `AuthError::AccountDisabled` for disabled accounts.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.keys.verify(token)?;
        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the user no longer exists.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    fn active_session(&self, user: User) -> Result<AuthSession, AuthError> {
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        self.session(user)
    }

    fn session(&self, user: User) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            token: self.keys.issue(user.id)?,
            token_type: "Bearer",
            expires_in: self.keys.ttl_seconds(),
            user,
        })
    }
}

/// Reset tokens are stored as a SHA-256 digest, never in clear.
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
