//! # smarttodo-db
//!
//! Persistence layer for smarttodo.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repositories for tasks, categories and context entries
//! - An in-memory store implementing the same traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use smarttodo_db::{Database, Repositories};
//!
//! let db = Database::connect("postgres://localhost/smarttodo").await?;
//! db.migrate().await?;
//! let repos = Repositories::postgres(&db);
//! ```

pub mod categories;
pub mod context;
pub mod memory;
pub mod pool;
pub mod tasks;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use smarttodo_core::*;

pub use categories::PgCategoryRepository;
pub use context::PgContextRepository;
pub use memory::InMemoryStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use tasks::PgTaskRepository;

/// Combined database context with all PostgreSQL repositories.
pub struct Database {
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub tasks: PgTaskRepository,
    pub categories: PgCategoryRepository,
    pub context: PgContextRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            tasks: PgTaskRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            context: PgContextRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

/// Trait-object handles to the three stores the engine works against.
#[derive(Clone)]
pub struct Repositories {
    pub tasks: Arc<dyn TaskRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub context: Arc<dyn ContextRepository>,
}

impl Repositories {
    /// Repositories backed by PostgreSQL.
    pub fn postgres(db: &Database) -> Self {
        Self {
            tasks: Arc::new(PgTaskRepository::new(db.pool.clone())),
            categories: Arc::new(PgCategoryRepository::new(db.pool.clone())),
            context: Arc::new(PgContextRepository::new(db.pool.clone())),
        }
    }

    /// Repositories sharing one fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            tasks: store.clone(),
            categories: store.clone(),
            context: store,
        }
    }
}
