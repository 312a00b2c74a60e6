//! Newsletter subscriber repository.

use sqlx::PgPool;

use techmart_core::Email;

use super::RepositoryError;
use crate::models::Subscriber;
use crate::response::PageParams;

pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address, reactivating it if it had unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn subscribe(&self, email: &Email) -> Result<Subscriber, RepositoryError> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            "INSERT INTO newsletter_subscribers (email) VALUES ($1) \
             ON CONFLICT (email) DO UPDATE SET is_active = TRUE, unsubscribed_at = NULL, \
               subscribed_at = CASE WHEN newsletter_subscribers.is_active \
                               THEN newsletter_subscribers.subscribed_at ELSE NOW() END \
             RETURNING id, email, is_active, subscribed_at, unsubscribed_at",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;
        Ok(subscriber)
    }

    /// Unsubscribe an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not subscribed.
    pub async fn unsubscribe(&self, email: &Email) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE newsletter_subscribers SET is_active = FALSE, unsubscribed_at = NOW() \
             WHERE email = $1 AND is_active",
        )
        .bind(email)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// A page of subscribers, newest first, and the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        active_only: bool,
        page: PageParams,
    ) -> Result<(Vec<Subscriber>, i64), RepositoryError> {
        let items = sqlx::query_as::<_, Subscriber>(
            "SELECT id, email, is_active, subscribed_at, unsubscribed_at \
             FROM newsletter_subscribers WHERE (NOT $1 OR is_active) \
             ORDER BY subscribed_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(active_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM newsletter_subscribers WHERE (NOT $1 OR is_active)",
        )
        .bind(active_only)
        .fetch_one(self.pool)
        .await?;

        Ok((items, total))
    }

    /// Every active address, for a campaign send.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_emails(&self) -> Result<Vec<Email>, RepositoryError> {
        let emails = sqlx::query_scalar(
            "SELECT email FROM newsletter_subscribers WHERE is_active ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(emails)
    }
}
