//! Category repository implementation.
//!
//! Usage counters are updated with single `UPDATE ... RETURNING` statements
//! so concurrent increments and decrements never lose an update.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use smarttodo_core::{Category, CategoryRepository, Error, Result};

/// PostgreSQL implementation of CategoryRepository.
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

impl PgCategoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn update_counter(&self, id: i64, expr: &str) -> Result<Category> {
        let sql = format!(
            "UPDATE category SET usage_count = {expr} WHERE id = $1 \
             RETURNING id, name, usage_count, created_at"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::CategoryNotFound(id))?;
        category_from_row(&row)
    }
}

fn category_from_row(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        usage_count: row.try_get("usage_count")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn resolve_or_create(&self, name: &str) -> Result<(Category, bool)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("category name cannot be empty".into()));
        }

        // The unique index on lower(name) arbitrates concurrent creators.
        let inserted = sqlx::query(
            "INSERT INTO category (name) VALUES ($1)
             ON CONFLICT ((lower(name))) DO NOTHING
             RETURNING id, name, usage_count, created_at",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(row) = inserted {
            let category = category_from_row(&row)?;
            debug!(
                subsystem = "db",
                component = "categories",
                category_id = category.id,
                "Created category"
            );
            return Ok((category, true));
        }

        let existing = self
            .find_by_name(name)
            .await?
            .ok_or_else(|| Error::Internal(format!("category '{name}' vanished after conflict")))?;
        Ok((existing, false))
    }

    async fn fetch(&self, id: i64) -> Result<Category> {
        let row = sqlx::query("SELECT id, name, usage_count, created_at FROM category WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::CategoryNotFound(id))?;
        category_from_row(&row)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, name, usage_count, created_at FROM category WHERE lower(name) = lower($1)",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, usage_count, created_at FROM category ORDER BY lower(name), id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(category_from_row).collect()
    }

    async fn top_names(&self, limit: usize) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM category ORDER BY usage_count DESC, lower(name) LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.into_iter().map(|row| row.get("name")).collect())
    }

    async fn increment_usage(&self, id: i64) -> Result<Category> {
        self.update_counter(id, "usage_count + 1").await
    }

    async fn decrement_usage(&self, id: i64) -> Result<Category> {
        self.update_counter(id, "GREATEST(usage_count - 1, 0)").await
    }
}
