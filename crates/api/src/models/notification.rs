//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use techmart_core::NotificationId;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
