//! Category Registry.
//!
//! Resolves free-text names to categories and maintains their usage
//! counters. Counter updates are single atomic statements in the store.
//! Resolution is additionally serialized per lowercased name inside this
//! process, so two tasks naming a new category at the same time end up with
//! one row and one increment each.

use std::sync::Arc;

use tracing::{debug, info};

use smarttodo_core::{defaults, Category, CategoryRepository, Error, Result};

use crate::locks::KeyedLocks;

pub struct CategoryRegistry {
    repo: Arc<dyn CategoryRepository>,
    name_locks: KeyedLocks<String>,
}

/// Trim and bound a category name.
pub fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("category name cannot be empty".into()));
    }
    if trimmed.chars().count() > defaults::CATEGORY_NAME_MAX_LEN {
        return Err(Error::InvalidInput(format!(
            "category name exceeds {} characters",
            defaults::CATEGORY_NAME_MAX_LEN
        )));
    }
    Ok(trimmed.to_string())
}

impl CategoryRegistry {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self {
            repo,
            name_locks: KeyedLocks::new(),
        }
    }

    /// Case-insensitive lookup, creating the category with a zero counter
    /// when absent.
    pub async fn resolve_or_create(&self, name: &str) -> Result<Category> {
        let name = normalize_name(name)?;
        let _guard = self.name_locks.lock(name.to_lowercase()).await;

        let (category, created) = self.repo.resolve_or_create(&name).await?;
        if created {
            info!(
                subsystem = "engine",
                component = "registry",
                category_id = category.id,
                name = %category.name,
                "Category created"
            );
        }
        Ok(category)
    }

    pub async fn fetch(&self, id: i64) -> Result<Category> {
        self.repo.fetch(id).await
    }

    pub async fn increment_usage(&self, id: i64) -> Result<Category> {
        let category = self.repo.increment_usage(id).await?;
        debug!(
            subsystem = "engine",
            component = "registry",
            category_id = id,
            usage_count = category.usage_count,
            "Category usage incremented"
        );
        Ok(category)
    }

    /// Decrement, clamping at zero. Decrementing zero succeeds unchanged.
    pub async fn decrement_usage(&self, id: i64) -> Result<Category> {
        let category = self.repo.decrement_usage(id).await?;
        debug!(
            subsystem = "engine",
            component = "registry",
            category_id = id,
            usage_count = category.usage_count,
            "Category usage decremented"
        );
        Ok(category)
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        self.repo.list().await
    }

    /// Most used names, offered to the model for reuse.
    pub async fn top_names(&self, limit: usize) -> Result<Vec<String>> {
        self.repo.top_names(limit).await
    }
}
