//! Task repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use smarttodo_core::{Error, NewTask, Result, Task, TaskQuery, TaskRepository, TaskStatus};

/// Columns selected for every task read, joined with the category name.
const TASK_COLUMNS: &str = r#"
    t.id, t.title, t.description, t.category_id, c.name AS category_name,
    t.priority_score, t.deadline, t.status, t.is_ai_suggested,
    t.created_at, t.updated_at
"#;

/// PostgreSQL implementation of TaskRepository.
pub struct PgTaskRepository {
    pool: Pool<Postgres>,
}

impl PgTaskRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn task_from_row(row: &PgRow) -> Result<Task> {
    let status: String = row.try_get("status")?;
    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category_id: row.try_get("category_id")?,
        category_name: row.try_get("category_name")?,
        priority_score: row.try_get("priority_score")?,
        deadline: row.try_get("deadline")?,
        status: status.parse::<TaskStatus>()?,
        is_ai_suggested: row.try_get("is_ai_suggested")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert(&self, task: NewTask) -> Result<Task> {
        let sql = format!(
            r#"
            WITH t AS (
                INSERT INTO task (title, description, category_id, priority_score,
                                  deadline, status, is_ai_suggested)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {TASK_COLUMNS}
            FROM t
            LEFT JOIN category c ON c.id = t.category_id
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.category_id)
            .bind(task.priority_score)
            .bind(task.deadline)
            .bind(task.status.as_str())
            .bind(task.is_ai_suggested)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        task_from_row(&row)
    }

    async fn fetch(&self, id: i64) -> Result<Task> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM task t LEFT JOIN category c ON c.id = t.category_id WHERE t.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::TaskNotFound(id))?;
        task_from_row(&row)
    }

    async fn update(&self, task: &Task) -> Result<Task> {
        // updated_at must strictly increase even when two writes share a clock tick.
        let sql = format!(
            r#"
            WITH t AS (
                UPDATE task
                SET title = $2,
                    description = $3,
                    category_id = $4,
                    priority_score = $5,
                    deadline = $6,
                    status = $7,
                    is_ai_suggested = $8,
                    updated_at = GREATEST(now(), updated_at + interval '1 microsecond')
                WHERE id = $1
                RETURNING *
            )
            SELECT {TASK_COLUMNS}
            FROM t
            LEFT JOIN category c ON c.id = t.category_id
            "#
        );
        let row = sqlx::query(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.category_id)
            .bind(task.priority_score)
            .bind(task.deadline)
            .bind(task.status.as_str())
            .bind(task.is_ai_suggested)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::TaskNotFound(task.id))?;
        task_from_row(&row)
    }

    async fn list(&self, query: TaskQuery) -> Result<Vec<Task>> {
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM task t
            LEFT JOIN category c ON c.id = t.category_id
            WHERE ($1::BIGINT IS NULL OR t.category_id = $1)
              AND ($2::TEXT IS NULL OR t.status = $2)
              AND ($3::INTEGER IS NULL OR t.priority_score >= $3)
              AND ($4::INTEGER IS NULL OR t.priority_score <= $4)
            ORDER BY t.priority_score DESC, t.deadline ASC NULLS LAST, t.created_at ASC, t.id ASC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(query.category_id)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.min_score)
            .bind(query.max_score)
            .bind(query.effective_limit())
            .bind(query.effective_offset())
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(task_from_row).collect()
    }
}
