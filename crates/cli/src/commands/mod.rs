//! CLI subcommands.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use techmart_api::db::{self, RepositoryError};
use techmart_api::services::auth::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] techmart_core::EmailError),

    /// Password rejected or could not be hashed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// A query failed or the account was not found.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// An account already uses the email.
    #[error("An account already exists with email: {0}")]
    UserExists(String),

    /// No account uses the email.
    #[error("No account found with email: {0}")]
    UserNotFound(String),
}

/// Connect using `TECHMART_DATABASE_URL`.
///
/// # Errors
///
/// Returns `CliError::MissingEnvVar` if the variable is unset and
/// `CliError::Database` if the connection fails.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TECHMART_DATABASE_URL")
        .map_err(|_| CliError::MissingEnvVar("TECHMART_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
