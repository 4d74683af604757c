//! User persistence.

use sqlx::{postgres::PgPool, postgres::PgRow, Row};

use super::DbError;
use crate::models::User;

struct UserRow(User);

impl<'r> sqlx::FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        }))
    }
}

/// Store for the `users` table.
#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user and return the serial id assigned by the database.
    pub async fn create(&self, user: &User) -> Result<i32, DbError> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (name, email)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_query)
    }

    pub async fn get(&self, id: i32) -> Result<User, DbError> {
        sqlx::query_as::<_, UserRow>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)?
            .map(|row| row.0)
            .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn update(&self, user: &User) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE users SET name = $1, email = $2 WHERE id = $3")
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_query)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", user.id));
        }
        Ok(())
    }

    /// Delete a user. Deleting a missing id is not an error.
    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_query)?;
        Ok(())
    }
}
