//! Product persistence.

use sqlx::{postgres::PgPool, postgres::PgRow, Row};
use uuid::Uuid;

use super::DbError;
use crate::models::Product;

struct ProductRow(Product);

impl<'r> sqlx::FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
        }))
    }
}

/// Store for the `products` table.
#[derive(Clone)]
pub struct ProductStore {
    pool: PgPool,
}

impl ProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, product: &Product) -> Result<Uuid, DbError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .execute(&self.pool)
        .await
        .map_err(DbError::from_query)?;
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, DbError> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?
        .map(|row| row.0)
        .ok_or_else(|| DbError::not_found("product", id))
    }

    pub async fn update(&self, product: &Product) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $1, description = $2, price = $3
            WHERE id = $4
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from_query)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("product", product.id));
        }
        Ok(())
    }

    /// Delete a product. Fails with `ForeignKey` while order items reference it.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_query)?;
        Ok(())
    }
}
