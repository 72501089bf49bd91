//! User management commands.
//!
//! ```bash
//! furnish-cli user create -e ada@example.com -f Ada -l Lovelace
//! furnish-cli user create -e ops@example.com -f Ops -l Team -r admin
//! ```

use furnish_core::UserRole;
use furnish_storefront::db::{RepositoryError, UserRepository};

use super::{CommandError, connect};

/// Create a user and log its ID.
///
/// # Errors
///
/// Returns an error for an invalid role or email, or if the email is taken.
pub async fn create(
    email: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> Result<(), CommandError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| CommandError::Invalid(format!("Invalid role: {role}. Valid roles: user, admin")))?;

    // Basic email validation
    if !email.contains('@') || !email.contains('.') {
        return Err(CommandError::Invalid(format!("Invalid email: {email}")));
    }

    let pool = connect().await?;

    tracing::info!("Creating user: {} ({})", email, role);
    let user = UserRepository::new(&pool)
        .create(first_name, last_name, email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                CommandError::Invalid(format!("User already exists with email: {email}"))
            }
            other => CommandError::Repository(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
