//! Address book entries.

use serde::Serialize;

use furnish_core::{AddressId, UserId};

/// A billing or shipping address owned by a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    /// Owner; orders may only reference the placing user's addresses.
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
}
