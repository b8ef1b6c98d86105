//! Context entry repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};

use smarttodo_core::{
    ContextEntry, ContextInsights, ContextRepository, Error, ListContextRequest, NewContextEntry,
    Result, SourceType,
};

const CONTEXT_COLUMNS: &str = "id, content, source_type, created_at, processed_insights";

/// PostgreSQL implementation of ContextRepository.
pub struct PgContextRepository {
    pool: Pool<Postgres>,
}

impl PgContextRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> Result<ContextEntry> {
    let source: String = row.try_get("source_type")?;
    let insights: Option<Json<ContextInsights>> = row.try_get("processed_insights")?;
    Ok(ContextEntry {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        source_type: source.parse::<SourceType>()?,
        timestamp: row.try_get("created_at")?,
        processed_insights: insights.map(|Json(i)| i),
    })
}

#[async_trait]
impl ContextRepository for PgContextRepository {
    async fn insert(&self, entry: NewContextEntry) -> Result<ContextEntry> {
        let sql = format!(
            "INSERT INTO context_entry (content, source_type, processed_insights)
             VALUES ($1, $2, $3) RETURNING {CONTEXT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&entry.content)
            .bind(entry.source_type.as_str())
            .bind(entry.processed_insights.map(Json))
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        entry_from_row(&row)
    }

    async fn fetch(&self, id: i64) -> Result<ContextEntry> {
        let sql = format!("SELECT {CONTEXT_COLUMNS} FROM context_entry WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::ContextNotFound(id))?;
        entry_from_row(&row)
    }

    async fn set_insights(&self, id: i64, insights: &ContextInsights) -> Result<ContextEntry> {
        let sql = format!(
            "UPDATE context_entry SET processed_insights = $2 WHERE id = $1 RETURNING {CONTEXT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(Json(insights))
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::ContextNotFound(id))?;
        entry_from_row(&row)
    }

    async fn list(&self, req: ListContextRequest) -> Result<Vec<ContextEntry>> {
        let sql = format!(
            r#"
            SELECT {CONTEXT_COLUMNS}
            FROM context_entry
            WHERE ($1::TEXT IS NULL OR source_type = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR created_at <= $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(req.source_type.map(|s| s.as_str()))
            .bind(req.start)
            .bind(req.end)
            .bind(req.limit.map(|l| l.max(0)))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(entry_from_row).collect()
    }
}
