//! Newsletter subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use techmart_core::{Email, SubscriberId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}
