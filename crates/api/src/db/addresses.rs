//! Address book repository.
//!
//! At most one address per user is the default; a partial unique index
//! enforces it, so every write that moves the flag clears the old default
//! first inside a transaction.

use sqlx::{PgConnection, PgPool};

use techmart_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::Address;

macro_rules! address_columns {
    () => {
        "id, user_id, recipient_name, phone, street, ward, district, province, is_default, \
         created_at, updated_at"
    };
}

/// Writable address fields.
#[derive(Debug)]
pub struct AddressInput<'a> {
    pub recipient_name: &'a str,
    pub phone: &'a str,
    pub street: &'a str,
    pub ward: &'a str,
    pub district: &'a str,
    pub province: &'a str,
    pub is_default: bool,
}

pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Addresses of a user, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(concat!(
            "SELECT ",
            address_columns!(),
            " FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// Create an address. A user's first address is always the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput<'_>,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let has_any: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM addresses WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        let is_default = input.is_default || !has_any;
        if is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(concat!(
            "INSERT INTO addresses (user_id, recipient_name, phone, street, ward, district, \
             province, is_default) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            address_columns!()
        ))
        .bind(user_id)
        .bind(input.recipient_name)
        .bind(input.phone)
        .bind(input.street)
        .bind(input.ward)
        .bind(input.district)
        .bind(input.province)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Update an address. Unsetting the default flag is ignored; pick
    /// another default instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput<'_>,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default_except(&mut tx, user_id, id).await?;
        }

        let address = sqlx::query_as::<_, Address>(concat!(
            "UPDATE addresses SET recipient_name = $3, phone = $4, street = $5, ward = $6, \
             district = $7, province = $8, is_default = is_default OR $9, updated_at = NOW() \
             WHERE id = $2 AND user_id = $1 RETURNING ",
            address_columns!()
        ))
        .bind(user_id)
        .bind(id)
        .bind(input.recipient_name)
        .bind(input.phone)
        .bind(input.street)
        .bind(input.ward)
        .bind(input.district)
        .bind(input.province)
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete an address. If it was the default, the newest remaining
    /// address is promoted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_default: bool = sqlx::query_scalar(
            "DELETE FROM addresses WHERE id = $2 AND user_id = $1 RETURNING is_default",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if was_default {
            sqlx::query(
                "UPDATE addresses SET is_default = TRUE, updated_at = NOW() WHERE id = ( \
                   SELECT id FROM addresses WHERE user_id = $1 \
                   ORDER BY created_at DESC, id DESC LIMIT 1)",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Make an address the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn set_default(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        clear_default_except(&mut tx, user_id, id).await?;
        let address = sqlx::query_as::<_, Address>(concat!(
            "UPDATE addresses SET is_default = TRUE, updated_at = NOW() \
             WHERE id = $2 AND user_id = $1 RETURNING ",
            address_columns!()
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }
}

async fn clear_default(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn clear_default_except(
    conn: &mut PgConnection,
    user_id: UserId,
    keep: AddressId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default AND id <> $2",
    )
    .bind(user_id)
    .bind(keep)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
