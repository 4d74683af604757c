//! Customer persistence.

use sqlx::{postgres::PgPool, postgres::PgRow, Row};
use uuid::Uuid;

use super::DbError;
use crate::models::Customer;

struct CustomerRow(Customer);

impl<'r> sqlx::FromRow<'r, PgRow> for CustomerRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Customer {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        }))
    }
}

/// Store for the `customers` table.
#[derive(Clone)]
pub struct CustomerStore {
    pool: PgPool,
}

impl CustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a customer under a freshly generated id.
    pub async fn create(&self, customer: &Customer) -> Result<Uuid, DbError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO customers (id, name, email) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&customer.name)
            .bind(&customer.email)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_query)?;
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Customer, DbError> {
        sqlx::query_as::<_, CustomerRow>("SELECT id, name, email FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)?
            .map(|row| row.0)
            .ok_or_else(|| DbError::not_found("customer", id))
    }

    pub async fn update(&self, customer: &Customer) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE customers SET name = $1, email = $2 WHERE id = $3")
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(customer.id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_query)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("customer", customer.id));
        }
        Ok(())
    }

    /// Delete a customer. Fails with `ForeignKey` while orders reference it.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_query)?;
        Ok(())
    }
}
