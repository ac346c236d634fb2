//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Promote a registered user to admin
//! sk-cli admin promote -e admin@example.com
//! ```

use sqlx::PgPool;
use thiserror::Error;

use storekeep_api::db::{RepositoryError, UserRepository};
use storekeep_core::{Email, EmailError, UserRole};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Nobody registered with this email.
    #[error("No user registered with email: {0}")]
    UnknownUser(String),

    /// Database error.
    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Give an existing user the admin role.
///
/// # Errors
///
/// Returns `AdminError::UnknownUser` if the email is not registered.
pub async fn promote(pool: &PgPool, email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email)?;

    let user = UserRepository::new(pool)
        .set_role(&email, UserRole::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownUser(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, "User promoted to admin");
    Ok(())
}
