//! Notification repository.

use sqlx::{PgConnection, PgPool};

use techmart_core::{NotificationId, UserId};

use super::RepositoryError;
use crate::models::Notification;
use crate::response::PageParams;

pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of a user's notifications, newest first, and the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        page: PageParams,
    ) -> Result<(Vec<Notification>, i64), RepositoryError> {
        let items = sqlx::query_as::<_, Notification>(
            "SELECT id, title, message, link, is_read, created_at FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((items, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification is not the user's.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $2 AND user_id = $1")
                .bind(user_id)
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark everything read; returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification is not the user's.
    pub async fn delete(&self, user_id: UserId, id: NotificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $2 AND user_id = $1")
            .bind(user_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Send the same notification to every active user in one statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn broadcast(
        &self,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, title, message, link) \
             SELECT id, $1, $2, $3 FROM users WHERE is_active",
        )
        .bind(title)
        .bind(message)
        .bind(link)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Queue a notification for one user as part of a larger transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn notify(
    conn: &mut PgConnection,
    user_id: UserId,
    title: &str,
    message: &str,
    link: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO notifications (user_id, title, message, link) VALUES ($1, $2, $3, $4)")
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(link)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
