//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! furnish-cli migrate
//! ```
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in
//! the storefront library.

use furnish_storefront::db::MIGRATOR;

use super::{CommandError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
