//! User repository: accounts and password reset tokens.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use techmart_core::{Email, UserId, UserRole};

use super::{RepositoryError, like_pattern};
use crate::models::User;
use crate::response::PageParams;

macro_rules! user_columns {
    () => {
        "id, name, email, phone, password_hash, google_id, avatar_url, role, is_active, \
         created_at, updated_at"
    };
}

/// Fields for a new account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub phone: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub google_id: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub role: UserRole,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by their (normalised) email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by their Google subject.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE google_id = $1"
        ))
        .bind(google_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (name, email, phone, password_hash, google_id, avatar_url, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            user_columns!()
        ))
        .bind(new.name)
        .bind(new.email)
        .bind(new.phone)
        .bind(new.password_hash)
        .bind(new.google_id)
        .bind(new.avatar_url)
        .bind(new.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "email already exists"))
    }

    /// Attach a Google subject to an existing account.
    ///
    /// The avatar is only filled in when the user has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the subject is linked elsewhere.
    pub async fn link_google(
        &self,
        id: UserId,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET google_id = $2, avatar_url = COALESCE(avatar_url, $3), \
             updated_at = NOW() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(google_id)
        .bind(avatar_url)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "google account already linked"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Update the editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        phone: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET name = $2, phone = $3, avatar_url = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(avatar_url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List users, optionally filtered by name or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<User>, i64), RepositoryError> {
        let pattern = search
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);

        let users = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok((users, total))
    }

    /// Update role and/or active flag; `None` leaves a field unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_access(
        &self,
        id: UserId,
        role: Option<UserRole>,
        is_active: Option<bool>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET role = COALESCE($2, role), is_active = COALESCE($3, is_active), \
             updated_at = NOW() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(role)
        .bind(is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set the role of the account with this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account uses the email.
    pub async fn set_role_by_email(
        &self,
        email: &Email,
        role: UserRole,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE email = $1 RETURNING ",
            user_columns!()
        ))
        .bind(email)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Store a hashed reset token, invalidating earlier unused ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE password_reset_tokens SET used_at = NOW() \
             WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Consume a reset token and set the new password in one transaction.
    ///
    /// The token is claimed with a conditional update, so it works once even
    /// under concurrent submissions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the token is unknown, used or expired.
    pub async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user_id: UserId = sqlx::query_scalar(
            "UPDATE password_reset_tokens SET used_at = NOW() \
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW() \
             RETURNING user_id",
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user_id)
    }
}
