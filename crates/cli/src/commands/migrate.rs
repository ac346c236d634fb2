//! Database migration command.
//!
//! Applies `crates/api/migrations/` and creates the session table owned by
//! `tower-sessions-sqlx-store`.

use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store error: {0}")]
    SessionStore(#[from] sqlx::Error),
}

/// Run all migrations.
///
/// # Errors
///
/// Returns `MigrationError` if a migration fails to apply.
pub async fn run(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running API migrations...");
    sqlx::migrate!("../api/migrations").run(pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
