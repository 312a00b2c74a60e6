//! Product reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;

use techmart_core::{ProductId, ReviewId, UserId};

/// A review joined with its author's and product's display names.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub product_name: String,
    pub user_id: UserId,
    pub user_name: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}
