//! Saved delivery addresses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use techmart_core::{AddressId, UserId};

/// A saved delivery address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    #[serde(skip)]
    pub user_id: UserId,
    pub recipient_name: String,
    pub phone: String,
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
