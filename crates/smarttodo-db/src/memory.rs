//! In-memory store implementing every repository trait.
//!
//! Used when no `DATABASE_URL` is configured and by engine tests. All state
//! sits behind one async mutex, so counter updates are atomic per call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use smarttodo_core::{
    Category, CategoryRepository, ContextEntry, ContextInsights, ContextRepository, Error,
    ListContextRequest, NewContextEntry, NewTask, Result, Task, TaskQuery, TaskRepository,
};

#[derive(Default)]
struct State {
    tasks: BTreeMap<i64, Task>,
    categories: BTreeMap<i64, Category>,
    contexts: BTreeMap<i64, ContextEntry>,
    next_task_id: i64,
    next_category_id: i64,
    next_context_id: i64,
}

impl State {
    fn category_name(&self, id: Option<i64>) -> Option<String> {
        id.and_then(|id| self.categories.get(&id)).map(|c| c.name.clone())
    }

    /// Task with the category name joined from the current category table.
    fn joined(&self, task: &Task) -> Task {
        Task {
            category_name: self.category_name(task.category_id),
            ..task.clone()
        }
    }

    fn find_category(&self, name: &str) -> Option<&Category> {
        let needle = name.trim().to_lowercase();
        self.categories
            .values()
            .find(|c| c.name.to_lowercase() == needle)
    }
}

/// Strictly later than `prev`, even when the clock has not advanced.
fn next_timestamp(prev: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > prev {
        now
    } else {
        prev + Duration::microseconds(1)
    }
}

/// Process-local store for tasks, categories and context entries.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn insert(&self, task: NewTask) -> Result<Task> {
        let mut state = self.state.lock().await;
        if let Some(id) = task.category_id {
            if !state.categories.contains_key(&id) {
                return Err(Error::CategoryNotFound(id));
            }
        }
        state.next_task_id += 1;
        let now = Utc::now();
        let row = Task {
            id: state.next_task_id,
            title: task.title,
            description: task.description,
            category_id: task.category_id,
            category_name: None,
            priority_score: task.priority_score,
            deadline: task.deadline,
            status: task.status,
            is_ai_suggested: task.is_ai_suggested,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(row.id, row.clone());
        Ok(state.joined(&row))
    }

    async fn fetch(&self, id: i64) -> Result<Task> {
        let state = self.state.lock().await;
        state
            .tasks
            .get(&id)
            .map(|t| state.joined(t))
            .ok_or(Error::TaskNotFound(id))
    }

    async fn update(&self, task: &Task) -> Result<Task> {
        let mut state = self.state.lock().await;
        if let Some(id) = task.category_id {
            if !state.categories.contains_key(&id) {
                return Err(Error::CategoryNotFound(id));
            }
        }
        let stored = state
            .tasks
            .get_mut(&task.id)
            .ok_or(Error::TaskNotFound(task.id))?;
        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.category_id = task.category_id;
        stored.priority_score = task.priority_score;
        stored.deadline = task.deadline;
        stored.status = task.status;
        stored.is_ai_suggested = task.is_ai_suggested;
        stored.updated_at = next_timestamp(stored.updated_at);
        let updated = stored.clone();
        Ok(state.joined(&updated))
    }

    async fn list(&self, query: TaskQuery) -> Result<Vec<Task>> {
        let state = self.state.lock().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| query.category_id.is_none() || t.category_id == query.category_id)
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| query.min_score.map_or(true, |m| t.priority_score >= m))
            .filter(|t| query.max_score.map_or(true, |m| t.priority_score <= m))
            .map(|t| state.joined(t))
            .collect();

        tasks.sort_by(|a, b| {
            b.priority_score
                .cmp(&a.priority_score)
                .then_with(|| match (a.deadline, b.deadline) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(tasks
            .into_iter()
            .skip(query.effective_offset() as usize)
            .take(query.effective_limit() as usize)
            .collect())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn resolve_or_create(&self, name: &str) -> Result<(Category, bool)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("category name cannot be empty".into()));
        }
        let mut state = self.state.lock().await;
        if let Some(existing) = state.find_category(name) {
            return Ok((existing.clone(), false));
        }
        state.next_category_id += 1;
        let category = Category {
            id: state.next_category_id,
            name: name.to_string(),
            usage_count: 0,
            created_at: Utc::now(),
        };
        state.categories.insert(category.id, category.clone());
        Ok((category, true))
    }

    async fn fetch(&self, id: i64) -> Result<Category> {
        let state = self.state.lock().await;
        state
            .categories
            .get(&id)
            .cloned()
            .ok_or(Error::CategoryNotFound(id))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let state = self.state.lock().await;
        Ok(state.find_category(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(categories)
    }

    async fn top_names(&self, limit: usize) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut categories: Vec<&Category> = state.categories.values().collect();
        categories.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(categories
            .into_iter()
            .take(limit)
            .map(|c| c.name.clone())
            .collect())
    }

    async fn increment_usage(&self, id: i64) -> Result<Category> {
        let mut state = self.state.lock().await;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(Error::CategoryNotFound(id))?;
        category.usage_count += 1;
        Ok(category.clone())
    }

    async fn decrement_usage(&self, id: i64) -> Result<Category> {
        let mut state = self.state.lock().await;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(Error::CategoryNotFound(id))?;
        category.usage_count = (category.usage_count - 1).max(0);
        Ok(category.clone())
    }
}

#[async_trait]
impl ContextRepository for InMemoryStore {
    async fn insert(&self, entry: NewContextEntry) -> Result<ContextEntry> {
        let mut state = self.state.lock().await;
        state.next_context_id += 1;
        let row = ContextEntry {
            id: state.next_context_id,
            content: entry.content,
            source_type: entry.source_type,
            timestamp: Utc::now(),
            processed_insights: entry.processed_insights,
        };
        state.contexts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn fetch(&self, id: i64) -> Result<ContextEntry> {
        let state = self.state.lock().await;
        state
            .contexts
            .get(&id)
            .cloned()
            .ok_or(Error::ContextNotFound(id))
    }

    async fn set_insights(&self, id: i64, insights: &ContextInsights) -> Result<ContextEntry> {
        let mut state = self.state.lock().await;
        let entry = state
            .contexts
            .get_mut(&id)
            .ok_or(Error::ContextNotFound(id))?;
        entry.processed_insights = Some(insights.clone());
        Ok(entry.clone())
    }

    async fn list(&self, req: ListContextRequest) -> Result<Vec<ContextEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<ContextEntry> = state
            .contexts
            .values()
            .filter(|e| req.source_type.map_or(true, |s| e.source_type == s))
            .filter(|e| req.start.map_or(true, |start| e.timestamp >= start))
            .filter(|e| req.end.map_or(true, |end| e.timestamp <= end))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        if let Some(limit) = req.limit {
            entries.truncate(limit.max(0) as usize);
        }
        Ok(entries)
    }
}
