//! Admin account management commands.
//!
//! The first admin has to be created here; after that admins can manage
//! roles through `PUT /api/admin/users/{id}`.
//!
//! ```bash
//! techmart-cli admin create -e admin@techmart.vn -n "Admin Name" -p 'S3cure-pass'
//! techmart-cli admin promote -e staff@techmart.vn
//! ```

use sqlx::PgPool;

use techmart_api::db::RepositoryError;
use techmart_api::db::users::{NewUser, UserRepository};
use techmart_api::services::auth::password::{hash_password, validate_password};
use techmart_core::{Email, UserId, UserRole};

use super::CliError;

/// Create a new admin account.
///
/// # Errors
///
/// Returns `CliError::InvalidEmail` for a malformed email, `CliError::Auth`
/// for a weak password and `CliError::UserExists` if the email is taken.
pub async fn create(
    pool: &PgPool,
    email: &str,
    name: &str,
    password: &str,
) -> Result<UserId, CliError> {
    let email = Email::parse(email)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    tracing::info!("Creating admin account: {}", email);

    let user = UserRepository::new(pool)
        .create(&NewUser {
            name: name.trim(),
            email: &email,
            phone: None,
            password_hash: Some(&password_hash),
            google_id: None,
            avatar_url: None,
            role: UserRole::Admin,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CliError::UserExists(email.to_string()),
            other => CliError::Repository(other),
        })?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns `CliError::UserNotFound` if no account uses the email.
pub async fn promote(pool: &PgPool, email: &str) -> Result<UserId, CliError> {
    let email = Email::parse(email)?;

    let user = UserRepository::new(pool)
        .set_role_by_email(&email, UserRole::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CliError::UserNotFound(email.to_string()),
            other => CliError::Repository(other),
        })?;

    tracing::info!("{} ({}) is now an admin", user.email, user.id);
    Ok(user.id)
}
