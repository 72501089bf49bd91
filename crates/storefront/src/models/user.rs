//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use furnish_core::{UserId, UserRole};

/// A storefront user as shown to administrators.
///
/// Credentials are managed by the identity service and never leave the
/// database through this type.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Role carried into issued bearer tokens.
    pub role: UserRole,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}
