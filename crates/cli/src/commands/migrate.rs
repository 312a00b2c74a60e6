//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the API
//! crate at compile time.
//!
//! ```bash
//! techmart-cli migrate
//! ```

use sqlx::PgPool;

use techmart_api::db;

use super::CliError;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `CliError::Migration` if a migration fails.
pub async fn run(pool: &PgPool) -> Result<(), CliError> {
    tracing::info!("Running migrations...");
    db::run_migrations(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
