//! Prioritization Engine.
//!
//! Merges explicit caller input, AI suggestions and stored task state into
//! the final task. The rules, per field:
//!
//! | Field | Order of precedence |
//! |-------|---------------------|
//! | score | draft > AI > stored > baseline |
//! | deadline | draft > stored > AI > configured default (creation only) |
//! | category | draft > stored > first AI candidate |
//! | description | draft > stored; AI enhancement only fills an empty one |
//! | status | draft > stored > pending |
//!
//! Stored values count as explicit except the score, so re-running the
//! engine with AI over an existing task re-derives its priority.
//! `is_ai_suggested` is set whenever AI fills a field and carried over on
//! later passes until a draft replaces score, deadline, category and
//! description together.
//!
//! Updates of one task id are serialized, so counters see each category
//! change once even when the same id is processed concurrently.
//!
//! The tier is never stored or taken from the model's label. It is derived
//! from the score under the configured thresholds on every read.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::Instant as Deadline;

use chrono::{Days, NaiveDate};
use tracing::{debug, info, warn};

use smarttodo_core::{
    defaults, priority, AiStatus, ApplyOptions, CategoryRef, ContextEntry, ContextRepository,
    Enrichment, Error, ListTasksRequest, NewTask, Result, Suggestion, SuggestionOutcome, Task,
    TaskDraft, TaskQuery, TaskRepository, TaskStatus, TaskView,
};
use smarttodo_inference::{SuggestionClient, SuggestionInput};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::locks::KeyedLocks;
use crate::registry::{normalize_name, CategoryRegistry};

/// Characters of raw content used as a hint for unanalyzed context entries.
const RAW_HINT_CHARS: usize = 200;

/// What to ask the model about.
#[derive(Debug, Clone)]
pub enum SuggestionTarget {
    /// An existing task.
    Task(i64),
    /// Free text that is not stored anywhere.
    Text { title: String, description: String },
}

/// Category the final task should point at, and whether the AI picked it.
struct CategoryPlan {
    id: Option<i64>,
    from_ai: bool,
}

pub struct PrioritizationEngine {
    tasks: Arc<dyn TaskRepository>,
    context: Arc<dyn ContextRepository>,
    registry: Arc<CategoryRegistry>,
    suggester: Option<SuggestionClient>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    /// Read-modify-write of one task runs under its id's lock.
    task_locks: KeyedLocks<i64>,
}

impl PrioritizationEngine {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        context: Arc<dyn ContextRepository>,
        registry: Arc<CategoryRegistry>,
        suggester: Option<SuggestionClient>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let suggester = suggester.map(|s| s.with_timeout(config.ai_call_timeout));
        Self {
            tasks,
            context,
            registry,
            suggester,
            config,
            clock,
            task_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn view(&self, task: Task) -> TaskView {
        task.into_view(&self.config.thresholds)
    }

    fn validate_title(title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("title cannot be empty".into()));
        }
        if title.chars().count() > defaults::TITLE_MAX_LEN {
            return Err(Error::InvalidInput(format!(
                "title exceeds {} characters",
                defaults::TITLE_MAX_LEN
            )));
        }
        Ok(())
    }

    /// Fetch every requested context entry. Any unknown id fails the call.
    async fn load_context(&self, ids: &[i64]) -> Result<Vec<ContextEntry>> {
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            entries.push(self.context.fetch(*id).await?);
        }
        Ok(entries)
    }

    fn context_hints(entries: &[ContextEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match &entry.processed_insights {
                Some(insights) => format!("{} ({})", insights.to_hint(), entry.source_type),
                None => {
                    let snippet: String = entry.content.chars().take(RAW_HINT_CHARS).collect();
                    format!("{}: {}", entry.source_type, snippet.trim())
                }
            })
            .collect()
    }

    /// One bounded suggestion call, or the reason there was none.
    ///
    /// With `deadline` the call is cut short when it passes, on top of the
    /// configured per-call timeout.
    async fn consult_ai(
        &self,
        title: &str,
        description: &str,
        context: &[ContextEntry],
        today: NaiveDate,
        deadline: Option<Deadline>,
    ) -> Result<SuggestionOutcome> {
        let Some(suggester) = self.suggester.as_ref().filter(|_| self.config.ai_enabled) else {
            return Ok(SuggestionOutcome::unavailable("AI suggestions are disabled"));
        };
        let suggester = match deadline {
            Some(at) => {
                let remaining = at.saturating_duration_since(Deadline::now());
                if remaining.is_zero() {
                    return Ok(SuggestionOutcome::unavailable(
                        "deadline passed before the AI call",
                    ));
                }
                suggester
                    .clone()
                    .with_timeout(remaining.min(self.config.ai_call_timeout))
            }
            None => suggester.clone(),
        };

        let existing = self
            .registry
            .top_names(defaults::PROMPT_CATEGORY_HINTS)
            .await?;
        let input = SuggestionInput::new(title, description, today)
            .with_context_hints(Self::context_hints(context))
            .with_existing_categories(existing);
        Ok(suggester.suggest(&input).await)
    }

    /// Create (`draft.id = None`) or update a task, optionally enriched by AI.
    pub async fn create_or_update_task(
        &self,
        draft: TaskDraft,
        options: ApplyOptions,
    ) -> Result<Enrichment> {
        self.apply(draft, options, None).await
    }

    /// Like [`Self::create_or_update_task`], with the AI call bounded by
    /// `ai_deadline`. Storage writes are never cut short.
    pub async fn create_or_update_task_by(
        &self,
        draft: TaskDraft,
        options: ApplyOptions,
        ai_deadline: Deadline,
    ) -> Result<Enrichment> {
        self.apply(draft, options, Some(ai_deadline)).await
    }

    async fn apply(
        &self,
        draft: TaskDraft,
        options: ApplyOptions,
        ai_deadline: Option<Deadline>,
    ) -> Result<Enrichment> {
        let start = Instant::now();
        let today = self.clock.today();

        let _guard = match draft.id {
            Some(id) => Some(self.task_locks.lock(id).await),
            None => None,
        };

        // Validation: nothing below may fail for caller-input reasons.
        let existing = match draft.id {
            Some(id) => Some(self.tasks.fetch(id).await?),
            None => None,
        };
        let title = match (&draft.title, &existing) {
            (Some(title), _) => title.trim().to_string(),
            (None, Some(task)) => task.title.clone(),
            (None, None) => String::new(),
        };
        Self::validate_title(&title)?;
        if let Some(score) = draft.priority_score {
            priority::validate_score(score)?;
        }
        let explicit_category = match &draft.category {
            Some(CategoryRef::Id(id)) => Some(CategoryRef::Id(self.registry.fetch(*id).await?.id)),
            Some(CategoryRef::Name(name)) => Some(CategoryRef::Name(normalize_name(name)?)),
            None => None,
        };
        let context = self.load_context(&options.context_ids).await?;

        let description = draft
            .description
            .clone()
            .or_else(|| existing.as_ref().map(|t| t.description.clone()))
            .unwrap_or_default();

        // AI consultation.
        let (ai, suggestion) = if !options.apply_ai {
            (AiStatus::Skipped, None)
        } else {
            match self
                .consult_ai(&title, &description, &context, today, ai_deadline)
                .await?
            {
                SuggestionOutcome::Suggested(s) => (AiStatus::Applied, Some(s)),
                SuggestionOutcome::Unavailable { reason } => {
                    warn!(
                        subsystem = "engine",
                        component = "prioritizer",
                        op = "apply_to_task",
                        task_id = ?draft.id,
                        reason = %reason,
                        "AI unavailable, using explicit fields only"
                    );
                    (AiStatus::Unavailable { reason }, None)
                }
            }
        };
        let suggestion = suggestion.unwrap_or_default();

        // Field merge.
        let mut ai_filled = false;

        let priority_score = match (draft.priority_score, suggestion.priority_score) {
            (Some(score), _) => score,
            (None, Some(score)) => {
                ai_filled = true;
                score
            }
            (None, None) => existing
                .as_ref()
                .map(|t| t.priority_score)
                .unwrap_or(self.config.baseline_score),
        };

        let stored_deadline = existing.as_ref().and_then(|t| t.deadline);
        let deadline = match (draft.deadline.or(stored_deadline), suggestion.deadline) {
            (Some(date), _) => Some(date),
            (None, Some(date)) => {
                ai_filled = true;
                Some(date)
            }
            (None, None) if existing.is_none() => self.default_deadline(today),
            (None, None) => None,
        };

        let mut description = description;
        if description.trim().is_empty() {
            if let Some(enhanced) = suggestion.enhanced_description.clone() {
                description = enhanced;
                ai_filled = true;
            }
        }

        let category = self
            .plan_category(explicit_category, existing.as_ref(), &suggestion)
            .await?;
        ai_filled |= category.from_ai;

        let status = draft
            .status
            .or_else(|| existing.as_ref().map(|t| t.status))
            .unwrap_or_default();

        // AI-set fields stay on the task until the caller replaces all of them.
        let replaces_all = draft.priority_score.is_some()
            && draft.deadline.is_some()
            && draft.category.is_some()
            && draft.description.is_some();
        let carried = existing
            .as_ref()
            .is_some_and(|t| t.is_ai_suggested && !replaces_all);
        let is_ai_suggested = ai_filled || carried;

        let score_source = if draft.priority_score.is_some() {
            "explicit"
        } else if suggestion.priority_score.is_some() {
            "ai"
        } else if existing.is_some() {
            "stored"
        } else {
            "baseline"
        };
        debug!(
            subsystem = "engine",
            component = "prioritizer",
            task_id = ?draft.id,
            score_source,
            ai_filled,
            "Fields merged"
        );

        // Persist, then count the category change.
        let previous_category = existing.as_ref().and_then(|t| t.category_id);
        let saved = match existing {
            Some(mut task) => {
                task.title = title;
                task.description = description;
                task.priority_score = priority_score;
                task.deadline = deadline;
                task.category_id = category.id;
                task.status = status;
                task.is_ai_suggested = is_ai_suggested;
                self.tasks.update(&task).await?
            }
            None => {
                self.tasks
                    .insert(NewTask {
                        title,
                        description,
                        category_id: category.id,
                        priority_score,
                        deadline,
                        status,
                        is_ai_suggested,
                    })
                    .await?
            }
        };
        self.count_category_change(previous_category, saved.category_id)
            .await?;

        info!(
            subsystem = "engine",
            component = "prioritizer",
            op = "apply_to_task",
            task_id = saved.id,
            priority_score = saved.priority_score,
            ai = ?ai,
            is_ai_suggested = saved.is_ai_suggested,
            duration_ms = start.elapsed().as_millis() as u64,
            "Task saved"
        );

        Ok(Enrichment {
            task: self.view(saved),
            ai,
        })
    }

    fn default_deadline(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.config
            .default_deadline_days
            .and_then(|days| today.checked_add_days(Days::new(u64::from(days))))
    }

    async fn plan_category(
        &self,
        explicit: Option<CategoryRef>,
        existing: Option<&Task>,
        suggestion: &Suggestion,
    ) -> Result<CategoryPlan> {
        match explicit {
            Some(CategoryRef::Id(id)) => Ok(CategoryPlan {
                id: Some(id),
                from_ai: false,
            }),
            Some(CategoryRef::Name(name)) => Ok(CategoryPlan {
                id: Some(self.registry.resolve_or_create(&name).await?.id),
                from_ai: false,
            }),
            None => {
                if let Some(id) = existing.and_then(|t| t.category_id) {
                    return Ok(CategoryPlan {
                        id: Some(id),
                        from_ai: false,
                    });
                }
                // Names from the model are advisory: one that fails
                // validation leaves the task uncategorized.
                match suggestion.categories.first() {
                    Some(name) => match self.registry.resolve_or_create(name).await {
                        Ok(category) => Ok(CategoryPlan {
                            id: Some(category.id),
                            from_ai: true,
                        }),
                        Err(Error::InvalidInput(msg)) => {
                            debug!(
                                subsystem = "engine",
                                component = "prioritizer",
                                error = %msg,
                                "Ignoring AI category candidate"
                            );
                            Ok(CategoryPlan {
                                id: None,
                                from_ai: false,
                            })
                        }
                        Err(e) => Err(e),
                    },
                    None => Ok(CategoryPlan {
                        id: None,
                        from_ai: false,
                    }),
                }
            }
        }
    }

    async fn count_category_change(&self, previous: Option<i64>, current: Option<i64>) -> Result<()> {
        if previous == current {
            return Ok(());
        }
        if let Some(id) = current {
            self.registry.increment_usage(id).await?;
        }
        if let Some(id) = previous {
            self.registry.decrement_usage(id).await?;
        }
        Ok(())
    }

    /// Manual override. Touches nothing but the score.
    pub async fn set_priority(&self, task_id: i64, score: i32) -> Result<TaskView> {
        priority::validate_score(score)?;
        let _guard = self.task_locks.lock(task_id).await;
        let mut task = self.tasks.fetch(task_id).await?;
        task.priority_score = score;
        let saved = self.tasks.update(&task).await?;
        info!(
            subsystem = "engine",
            component = "prioritizer",
            op = "set_priority",
            task_id,
            priority_score = score,
            "Priority set"
        );
        Ok(self.view(saved))
    }

    /// Link the task to the named category, creating it if needed.
    ///
    /// Counters move only when the category actually changes: the new one is
    /// incremented and the previous one, if any, decremented.
    pub async fn assign_category_by_name(&self, task_id: i64, name: &str) -> Result<TaskView> {
        let _guard = self.task_locks.lock(task_id).await;
        let mut task = self.tasks.fetch(task_id).await?;
        let category = self.registry.resolve_or_create(name).await?;

        if task.category_id == Some(category.id) {
            debug!(
                subsystem = "engine",
                component = "prioritizer",
                task_id,
                category_id = category.id,
                "Category unchanged"
            );
            return Ok(self.view(task));
        }

        let previous = task.category_id;
        task.category_id = Some(category.id);
        let saved = self.tasks.update(&task).await?;
        self.count_category_change(previous, Some(category.id)).await?;

        info!(
            subsystem = "engine",
            component = "prioritizer",
            op = "assign_category",
            task_id,
            category_id = category.id,
            previous_category_id = ?previous,
            "Category assigned"
        );
        Ok(self.view(saved))
    }

    /// Mark a task completed. Completing a completed task is a no-op.
    pub async fn complete_task(&self, task_id: i64) -> Result<TaskView> {
        let _guard = self.task_locks.lock(task_id).await;
        let mut task = self.tasks.fetch(task_id).await?;
        if task.status == TaskStatus::Completed {
            return Ok(self.view(task));
        }
        task.status = TaskStatus::Completed;
        let saved = self.tasks.update(&task).await?;
        info!(
            subsystem = "engine",
            component = "prioritizer",
            op = "complete_task",
            task_id,
            "Task completed"
        );
        Ok(self.view(saved))
    }

    /// Ask for a suggestion without changing anything.
    pub async fn get_ai_suggestions(
        &self,
        target: SuggestionTarget,
        context_ids: &[i64],
    ) -> Result<SuggestionOutcome> {
        let (title, description) = match target {
            SuggestionTarget::Task(id) => {
                let task = self.tasks.fetch(id).await?;
                (task.title, task.description)
            }
            SuggestionTarget::Text { title, description } => (title, description),
        };
        if title.trim().is_empty() && description.trim().is_empty() {
            return Err(Error::InvalidInput(
                "title or description is required for suggestions".into(),
            ));
        }
        let context = self.load_context(context_ids).await?;
        self.consult_ai(&title, &description, &context, self.clock.today(), None)
            .await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<TaskView> {
        Ok(self.view(self.tasks.fetch(task_id).await?))
    }

    /// List tasks. A tier filter is turned into score bounds under the
    /// current thresholds.
    pub async fn list_tasks(&self, req: ListTasksRequest) -> Result<Vec<TaskView>> {
        let (min_score, max_score) = match req.priority {
            Some(tier) => {
                let (lo, hi) = self.config.thresholds.range_for(tier);
                (Some(lo), Some(hi))
            }
            None => (None, None),
        };
        let tasks = self
            .tasks
            .list(TaskQuery {
                category_id: req.category_id,
                status: req.status,
                min_score,
                max_score,
                limit: req.limit,
                offset: req.offset,
            })
            .await?;
        Ok(tasks.into_iter().map(|t| self.view(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use smarttodo_core::PriorityTier;
    use smarttodo_db::Repositories;
    use smarttodo_inference::mock::MockGenerationBackend;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    struct Fixture {
        engine: PrioritizationEngine,
        repos: Repositories,
        registry: Arc<CategoryRegistry>,
        backend: MockGenerationBackend,
    }

    fn fixture_with(backend: MockGenerationBackend, config: EngineConfig) -> Fixture {
        let repos = Repositories::in_memory();
        let registry = Arc::new(CategoryRegistry::new(repos.categories.clone()));
        let engine = PrioritizationEngine::new(
            repos.tasks.clone(),
            repos.context.clone(),
            registry.clone(),
            Some(SuggestionClient::new(Arc::new(backend.clone()))),
            config,
            Arc::new(FixedClock(today())),
        );
        Fixture {
            engine,
            repos,
            registry,
            backend,
        }
    }

    fn fixture(response: &str) -> Fixture {
        fixture_with(
            MockGenerationBackend::new().with_fixed_response(response),
            EngineConfig::default(),
        )
    }

    const FULL_SUGGESTION: &str = r#"{"priority_score": 20, "priority": "high",
        "deadline": "2025-03-20", "categories": ["Finance", "Admin"],
        "enhanced_description": "Collect all receipts."}"#;

    // =========================================================================
    // create_or_update_task
    // =========================================================================

    #[tokio::test]
    async fn test_create_without_ai_uses_baseline() {
        let f = fixture(FULL_SUGGESTION);
        let result = f
            .engine
            .create_or_update_task(TaskDraft::new("Water plants"), ApplyOptions::without_ai())
            .await
            .unwrap();

        assert_eq!(result.ai, AiStatus::Skipped);
        assert_eq!(result.task.task.priority_score, 50);
        assert_eq!(result.task.priority, PriorityTier::Medium);
        assert_eq!(result.task.task.status, TaskStatus::Pending);
        assert!(!result.task.task.is_ai_suggested);
        assert_eq!(f.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ai_fills_absent_fields() {
        let f = fixture(FULL_SUGGESTION);
        let result = f
            .engine
            .create_or_update_task(TaskDraft::new("Taxes"), ApplyOptions::with_ai())
            .await
            .unwrap();

        let task = &result.task.task;
        assert_eq!(result.ai, AiStatus::Applied);
        assert_eq!(task.priority_score, 20);
        // Tier comes from the score, not the model's "high" label.
        assert_eq!(result.task.priority, PriorityTier::Low);
        assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2025, 3, 20));
        assert_eq!(task.description, "Collect all receipts.");
        assert_eq!(task.category_name.as_deref(), Some("Finance"));
        assert!(task.is_ai_suggested);

        let finance = f.registry.list().await.unwrap();
        assert_eq!(finance.len(), 1);
        assert_eq!(finance[0].usage_count, 1);
    }

    #[tokio::test]
    async fn test_explicit_values_win() {
        let f = fixture(FULL_SUGGESTION);
        let deadline = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let result = f
            .engine
            .create_or_update_task(
                TaskDraft::new("Taxes")
                    .with_description("Use the new accountant")
                    .with_priority_score(80)
                    .with_deadline(deadline)
                    .with_category_name("Personal"),
                ApplyOptions::with_ai(),
            )
            .await
            .unwrap();

        let task = &result.task.task;
        assert_eq!(task.priority_score, 80);
        assert_eq!(result.task.priority, PriorityTier::High);
        assert_eq!(task.deadline, Some(deadline));
        assert_eq!(task.description, "Use the new accountant");
        assert_eq!(task.category_name.as_deref(), Some("Personal"));
        assert!(!task.is_ai_suggested);
        // The AI's category was never created.
        assert!(f.registry.list().await.unwrap().iter().all(|c| c.name != "Finance"));
    }

    #[tokio::test]
    async fn test_ai_failure_degrades_to_explicit_fields() {
        let f = fixture_with(MockGenerationBackend::failing(), EngineConfig::default());
        let result = f
            .engine
            .create_or_update_task(
                TaskDraft::new("X").with_description("Y"),
                ApplyOptions::with_ai(),
            )
            .await
            .unwrap();

        assert!(matches!(result.ai, AiStatus::Unavailable { .. }));
        assert!(!result.task.task.is_ai_suggested);
        assert_eq!(result.task.task.priority_score, 50);
        assert_eq!(f.backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ai_disabled_reports_unavailable() {
        let f = fixture_with(
            MockGenerationBackend::new().with_fixed_response(FULL_SUGGESTION),
            EngineConfig::default().with_ai_enabled(false),
        );
        let result = f
            .engine
            .create_or_update_task(TaskDraft::new("X"), ApplyOptions::with_ai())
            .await
            .unwrap();
        assert!(matches!(result.ai, AiStatus::Unavailable { .. }));
        assert_eq!(f.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_title_rejected_without_side_effects() {
        let f = fixture(FULL_SUGGESTION);
        let err = f
            .engine
            .create_or_update_task(
                TaskDraft::new("   ").with_category_name("Work"),
                ApplyOptions::with_ai(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(f.backend.call_count(), 0);
        assert!(f.registry.list().await.unwrap().is_empty());
        assert!(f
            .engine
            .list_tasks(ListTasksRequest::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_score_rejected() {
        let f = fixture("{}");
        let err = f
            .engine
            .create_or_update_task(
                TaskDraft::new("X").with_priority_score(101),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unknown_category_id_is_not_found() {
        let f = fixture("{}");
        let err = f
            .engine
            .create_or_update_task(
                TaskDraft::new("X").with_category_id(77),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CategoryNotFound(77)));
    }

    #[tokio::test]
    async fn test_update_rederives_score_but_keeps_stored_fields() {
        let f = fixture(r#"{"priority_score": 90, "deadline": "2025-03-12", "categories": ["Other"]}"#);
        let deadline = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let created = f
            .engine
            .create_or_update_task(
                TaskDraft::new("Report")
                    .with_deadline(deadline)
                    .with_category_name("Work"),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap();
        let id = created.task.task.id;

        let updated = f
            .engine
            .create_or_update_task(TaskDraft::for_update(id), ApplyOptions::with_ai())
            .await
            .unwrap();

        let task = &updated.task.task;
        assert_eq!(task.title, "Report");
        assert_eq!(task.priority_score, 90);
        assert_eq!(task.deadline, Some(deadline));
        assert_eq!(task.category_name.as_deref(), Some("Work"));
        assert!(task.is_ai_suggested);
        assert!(task.updated_at > created.task.task.updated_at);
    }

    #[tokio::test]
    async fn test_update_without_ai_keeps_flag_and_score() {
        let f = fixture(r#"{"priority_score": 90}"#);
        let created = f
            .engine
            .create_or_update_task(TaskDraft::new("Report"), ApplyOptions::with_ai())
            .await
            .unwrap();
        assert!(created.task.task.is_ai_suggested);

        let updated = f
            .engine
            .create_or_update_task(
                TaskDraft::for_update(created.task.task.id).with_status(TaskStatus::InProgress),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap();
        assert_eq!(updated.task.task.priority_score, 90);
        assert_eq!(updated.task.task.status, TaskStatus::InProgress);
        assert!(updated.task.task.is_ai_suggested);
    }

    #[tokio::test]
    async fn test_update_changing_category_moves_counters() {
        let f = fixture("{}");
        let created = f
            .engine
            .create_or_update_task(
                TaskDraft::new("Report").with_category_name("Work"),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap();
        f.engine
            .create_or_update_task(
                TaskDraft::for_update(created.task.task.id).with_category_name("Home"),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap();

        let counts: Vec<(String, i64)> = f
            .registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.name, c.usage_count))
            .collect();
        assert_eq!(
            counts,
            vec![("Home".to_string(), 1), ("Work".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_not_found() {
        let f = fixture("{}");
        let err = f
            .engine
            .create_or_update_task(TaskDraft::for_update(999), ApplyOptions::with_ai())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(999)));
        assert_eq!(f.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_default_deadline_on_creation_only() {
        let f = fixture_with(
            MockGenerationBackend::new(),
            EngineConfig::default().with_default_deadline_days(Some(7)),
        );
        let created = f
            .engine
            .create_or_update_task(TaskDraft::new("X"), ApplyOptions::without_ai())
            .await
            .unwrap();
        assert_eq!(
            created.task.task.deadline,
            NaiveDate::from_ymd_opt(2025, 3, 17)
        );
    }

    #[tokio::test]
    async fn test_context_hints_reach_prompt() {
        let f = fixture(r#"{"priority_score": 75}"#);
        let entry = f
            .repos
            .context
            .insert(smarttodo_core::NewContextEntry {
                content: "Boss says the deck is urgent".into(),
                source_type: smarttodo_core::SourceType::Email,
                processed_insights: None,
            })
            .await
            .unwrap();
        f.registry.resolve_or_create("Work").await.unwrap();

        f.engine
            .create_or_update_task(
                TaskDraft::new("Slide deck"),
                ApplyOptions::with_ai().with_context([entry.id]),
            )
            .await
            .unwrap();

        let calls = f.backend.get_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("email: Boss says the deck is urgent"));
        assert!(calls[0].prompt.contains("Existing categories (reuse one when it fits): Work"));
        assert!(calls[0].prompt.contains("Today is 2025-03-10"));
    }

    #[tokio::test]
    async fn test_unknown_context_id_is_not_found() {
        let f = fixture("{}");
        let err = f
            .engine
            .create_or_update_task(
                TaskDraft::new("X"),
                ApplyOptions::with_ai().with_context([5]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContextNotFound(5)));
    }

    // =========================================================================
    // set_priority
    // =========================================================================

    #[tokio::test]
    async fn test_set_priority_every_valid_score() {
        let f = fixture("{}");
        let id = f
            .engine
            .create_or_update_task(TaskDraft::new("X"), ApplyOptions::without_ai())
            .await
            .unwrap()
            .task
            .task
            .id;

        for score in 0..=100 {
            f.engine.set_priority(id, score).await.unwrap();
            let view = f.engine.get_task(id).await.unwrap();
            assert_eq!(view.task.priority_score, score);
            let expected = if score < 34 {
                PriorityTier::Low
            } else if score < 67 {
                PriorityTier::Medium
            } else {
                PriorityTier::High
            };
            assert_eq!(view.priority, expected, "score {score}");
        }
    }

    #[tokio::test]
    async fn test_set_priority_out_of_range_leaves_task_unchanged() {
        let f = fixture("{}");
        let created = f
            .engine
            .create_or_update_task(
                TaskDraft::new("X").with_priority_score(40),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap();
        let id = created.task.task.id;

        for bad in [-1, 101, i32::MIN, i32::MAX] {
            assert!(matches!(
                f.engine.set_priority(id, bad).await,
                Err(Error::InvalidInput(_))
            ));
        }
        let after = f.engine.get_task(id).await.unwrap();
        assert_eq!(after, created.task);
    }

    #[tokio::test]
    async fn test_set_priority_keeps_category_and_deadline() {
        let f = fixture("{}");
        let deadline = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let created = f
            .engine
            .create_or_update_task(
                TaskDraft::new("X")
                    .with_deadline(deadline)
                    .with_category_name("Work"),
                ApplyOptions::without_ai(),
            )
            .await
            .unwrap();
        let view = f.engine.set_priority(created.task.task.id, 99).await.unwrap();
        assert_eq!(view.task.deadline, Some(deadline));
        assert_eq!(view.task.category_name.as_deref(), Some("Work"));
        assert_eq!(f.backend.call_count(), 0);
    }

    // =========================================================================
    // assign_category_by_name
    // =========================================================================

    #[tokio::test]
    async fn test_assign_same_name_twice() {
        let f = fixture("{}");
        let id = f
            .engine
            .create_or_update_task(TaskDraft::new("X"), ApplyOptions::without_ai())
            .await
            .unwrap()
            .task
            .task
            .id;

        let first = f.engine.assign_category_by_name(id, "Work").await.unwrap();
        let second = f.engine.assign_category_by_name(id, "work").await.unwrap();

        assert_eq!(first.task.category_id, second.task.category_id);
        let work = f.registry.fetch(first.task.category_id.unwrap()).await.unwrap();
        assert_eq!(work.usage_count, 1);
    }

    #[tokio::test]
    async fn test_reassign_decrements_previous() {
        let f = fixture("{}");
        let id = f
            .engine
            .create_or_update_task(TaskDraft::new("X"), ApplyOptions::without_ai())
            .await
            .unwrap()
            .task
            .task
            .id;

        let work = f.engine.assign_category_by_name(id, "Work").await.unwrap();
        let home = f.engine.assign_category_by_name(id, "Home").await.unwrap();

        let work_cat = f.registry.fetch(work.task.category_id.unwrap()).await.unwrap();
        let home_cat = f.registry.fetch(home.task.category_id.unwrap()).await.unwrap();
        assert_eq!(work_cat.usage_count, 0);
        assert_eq!(home_cat.usage_count, 1);
        assert_eq!(home.task.category_name.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn test_assign_unknown_task_creates_nothing() {
        let f = fixture("{}");
        assert!(matches!(
            f.engine.assign_category_by_name(404, "Work").await,
            Err(Error::TaskNotFound(404))
        ));
        assert!(f.registry.list().await.unwrap().is_empty());
    }

    // =========================================================================
    // complete_task
    // =========================================================================

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let f = fixture("{}");
        let id = f
            .engine
            .create_or_update_task(TaskDraft::new("X"), ApplyOptions::without_ai())
            .await
            .unwrap()
            .task
            .task
            .id;

        let first = f.engine.complete_task(id).await.unwrap();
        let second = f.engine.complete_task(id).await.unwrap();
        assert_eq!(first.task.status, TaskStatus::Completed);
        assert_eq!(second.task.status, TaskStatus::Completed);
        assert_eq!(first.task.updated_at, second.task.updated_at);
    }

    #[tokio::test]
    async fn test_complete_unknown_task() {
        let f = fixture("{}");
        assert!(matches!(
            f.engine.complete_task(3).await,
            Err(Error::TaskNotFound(3))
        ));
    }

    // =========================================================================
    // get_ai_suggestions / list_tasks
    // =========================================================================

    #[tokio::test]
    async fn test_suggestions_for_text_change_nothing() {
        let f = fixture(FULL_SUGGESTION);
        let outcome = f
            .engine
            .get_ai_suggestions(
                SuggestionTarget::Text {
                    title: "Taxes".into(),
                    description: String::new(),
                },
                &[],
            )
            .await
            .unwrap();

        assert_eq!(outcome.suggestion().unwrap().priority_score, Some(20));
        assert!(f.registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_for_task() {
        let f = fixture(FULL_SUGGESTION);
        let id = f
            .engine
            .create_or_update_task(TaskDraft::new("Taxes"), ApplyOptions::without_ai())
            .await
            .unwrap()
            .task
            .task
            .id;
        let outcome = f
            .engine
            .get_ai_suggestions(SuggestionTarget::Task(id), &[])
            .await
            .unwrap();
        assert!(outcome.suggestion().is_some());
        assert!(f.backend.get_calls()[0].prompt.contains("Task title: Taxes"));
    }

    #[tokio::test]
    async fn test_suggestions_require_text() {
        let f = fixture(FULL_SUGGESTION);
        let result = f
            .engine
            .get_ai_suggestions(
                SuggestionTarget::Text {
                    title: " ".into(),
                    description: String::new(),
                },
                &[],
            )
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_list_by_tier_uses_thresholds() {
        let f = fixture("{}");
        for (title, score) in [("low", 10), ("mid", 50), ("high", 90), ("edge", 67)] {
            f.engine
                .create_or_update_task(
                    TaskDraft::new(title).with_priority_score(score),
                    ApplyOptions::without_ai(),
                )
                .await
                .unwrap();
        }

        let high = f
            .engine
            .list_tasks(ListTasksRequest {
                priority: Some(PriorityTier::High),
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<&str> = high.iter().map(|v| v.task.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "edge"]);
        assert!(high.iter().all(|v| v.priority == PriorityTier::High));
    }
}
