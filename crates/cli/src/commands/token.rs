//! Issue a bearer token for an existing user.
//!
//! There is no login endpoint; tokens for local testing come from here.
//!
//! ```bash
//! furnish-cli token --user-id 1
//! furnish-cli token --user-id 1 --role admin
//! ```

use furnish_core::{UserId, UserRole};
use furnish_storefront::config::AuthConfig;
use furnish_storefront::db::UserRepository;
use furnish_storefront::services::TokenService;

use super::{CommandError, connect};

/// Print a signed token for `user_id` to stdout.
///
/// The role defaults to the one stored for the user; passing `role`
/// overrides it.
///
/// # Errors
///
/// Returns an error if the secret is misconfigured, the user does not exist,
/// or signing fails.
pub async fn issue(user_id: i32, role: Option<&str>) -> Result<(), CommandError> {
    let auth = AuthConfig::from_env()?;

    let override_role = role
        .map(|r| {
            r.parse::<UserRole>()
                .map_err(|_| CommandError::Invalid(format!("Invalid role: {r}. Valid roles: user, admin")))
        })
        .transpose()?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool)
        .get_by_id(UserId::new(user_id))
        .await?
        .ok_or_else(|| CommandError::Invalid(format!("User {user_id} not found")))?;

    let role = override_role.unwrap_or(user.role);
    let token = TokenService::new(&auth)
        .issue(user.id, role)
        .map_err(|e| CommandError::Invalid(format!("Failed to sign token: {e}")))?;

    tracing::info!(user_id = %user.id, email = %user.email, %role, ttl_secs = auth.token_ttl_secs, "Token issued");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}
