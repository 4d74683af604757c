//! Order persistence.
//!
//! An order owns its items: items are written with the order, replaced with
//! it on update and removed by `ON DELETE CASCADE` when the order goes.

use sqlx::{postgres::PgPool, postgres::PgRow, Postgres, Row, Transaction};
use uuid::Uuid;

use super::DbError;
use crate::models::{Order, OrderItem};

struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    status: String,
    total: f64,
}

impl<'r> sqlx::FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            status: row.try_get("status")?,
            total: row.try_get("total")?,
        })
    }
}

struct OrderItemRow(OrderItem);

impl<'r> sqlx::FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self(OrderItem {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
        }))
    }
}

/// Store for the `orders` and `order_items` tables.
#[derive(Clone)]
pub struct OrderStore {
    pool: PgPool,
}

impl OrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order with all of its items and return the new order id.
    pub async fn create(&self, order: &Order) -> Result<Uuid, DbError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, total)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(order.customer_id)
        .bind(&order.status)
        .bind(order.total)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from_query)?;

        for (line_no, item) in order.items.iter().enumerate() {
            insert_item(&mut tx, id, line_no, item).await?;
        }

        tx.commit().await.map_err(DbError::Query)?;
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order, DbError> {
        let order = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, status, total FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?
        .ok_or_else(|| DbError::not_found("order", id))?;

        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?
        .into_iter()
        .map(|row| row.0)
        .collect();

        Ok(Order {
            id: order.id,
            customer_id: order.customer_id,
            status: order.status,
            total: order.total,
            items,
        })
    }

    /// Replace an order's fields and items.
    ///
    /// Items are keyed by product: an item whose product is already on the
    /// order keeps its id and gets the new quantity, new products are added
    /// and products no longer listed are removed.
    pub async fn update(&self, order: &Order) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET customer_id = $1, status = $2, total = $3
            WHERE id = $4
            "#,
        )
        .bind(order.customer_id)
        .bind(&order.status)
        .bind(order.total)
        .bind(order.id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from_query)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("order", order.id));
        }

        let product_ids: Vec<Uuid> = order.items.iter().map(|item| item.product_id).collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (product_id = ANY($2))")
            .bind(order.id)
            .bind(product_ids)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from_query)?;

        for (line_no, item) in order.items.iter().enumerate() {
            let updated = sqlx::query(
                r#"
                UPDATE order_items
                SET quantity = $1, line_no = $2
                WHERE order_id = $3 AND product_id = $4
                "#,
            )
            .bind(item.quantity)
            .bind(line_no as i32)
            .bind(order.id)
            .bind(item.product_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from_query)?;

            if updated.rows_affected() == 0 {
                insert_item(&mut tx, order.id, line_no, item).await?;
            }
        }

        tx.commit().await.map_err(DbError::Query)?;
        Ok(())
    }

    /// Delete an order and, by cascade, its items.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_query)?;
        Ok(())
    }
}

async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    line_no: usize,
    item: &OrderItem,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO order_items (id, order_id, product_id, quantity, line_no)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(line_no as i32)
    .execute(&mut **tx)
    .await
    .map_err(DbError::from_query)?;
    Ok(())
}
