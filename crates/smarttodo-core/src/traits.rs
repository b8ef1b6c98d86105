//! Core traits for smarttodo abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::defaults;
use crate::error::Result;
use crate::models::*;
use crate::priority::PriorityTier;

// =============================================================================
// TASK REPOSITORY TRAITS
// =============================================================================

/// Caller-facing request for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct ListTasksRequest {
    pub category_id: Option<i64>,
    pub status: Option<TaskStatus>,
    /// Evaluated against the current thresholds.
    pub priority: Option<PriorityTier>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Storage-level task query. Tier filters arrive here as score bounds.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub category_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TaskQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(defaults::PAGE_LIMIT).max(0)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Repository for task persistence.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task; the store assigns id and timestamps.
    async fn insert(&self, task: NewTask) -> Result<Task>;

    /// Fetch a task by ID. Fails with `TaskNotFound` when absent.
    async fn fetch(&self, id: i64) -> Result<Task>;

    /// Persist every mutable field of `task` and bump `updated_at`.
    async fn update(&self, task: &Task) -> Result<Task>;

    /// List tasks ordered by score desc, deadline asc (nulls last),
    /// created_at asc.
    async fn list(&self, query: TaskQuery) -> Result<Vec<Task>>;
}

// =============================================================================
// CATEGORY REPOSITORY TRAITS
// =============================================================================

/// Repository for categories and their usage counters.
///
/// Counter updates must be atomic in the store itself; callers never
/// read-modify-write `usage_count`.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Case-insensitive lookup, creating the category with a zero counter
    /// when absent. The flag is true when a row was created.
    async fn resolve_or_create(&self, name: &str) -> Result<(Category, bool)>;

    /// Fetch a category by ID. Fails with `CategoryNotFound` when absent.
    async fn fetch(&self, id: i64) -> Result<Category>;

    /// Case-insensitive lookup without creation.
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// All categories ordered by name, case-insensitive.
    async fn list(&self) -> Result<Vec<Category>>;

    /// Names of the most used categories, highest counter first.
    async fn top_names(&self, limit: usize) -> Result<Vec<String>>;

    /// Add one to the counter.
    async fn increment_usage(&self, id: i64) -> Result<Category>;

    /// Subtract one from the counter, clamping at zero.
    async fn decrement_usage(&self, id: i64) -> Result<Category>;
}

// =============================================================================
// CONTEXT REPOSITORY TRAITS
// =============================================================================

/// Request for listing context entries.
#[derive(Debug, Clone, Default)]
pub struct ListContextRequest {
    pub source_type: Option<SourceType>,
    /// Inclusive lower bound on `timestamp`.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`.
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Repository for context entries.
#[async_trait]
pub trait ContextRepository: Send + Sync {
    async fn insert(&self, entry: NewContextEntry) -> Result<ContextEntry>;

    /// Fetch an entry by ID. Fails with `ContextNotFound` when absent.
    async fn fetch(&self, id: i64) -> Result<ContextEntry>;

    /// Replace the processed insights of an entry.
    async fn set_insights(&self, id: i64, insights: &ContextInsights) -> Result<ContextEntry>;

    /// List entries newest first.
    async fn list(&self, req: ListContextRequest) -> Result<Vec<ContextEntry>>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::new(
            defaults::SUGGESTION_TEMPERATURE,
            defaults::SUGGESTION_MAX_TOKENS,
        )
    }
}

/// Backend for text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text with system context.
    async fn generate_with_system(
        &self,
        system: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool>;
}
