//! Service facade exposing every engine operation to outer layers.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use smarttodo_core::{
    ApplyOptions, Category, ContextEntry, Enrichment, GenerationBackend, ListContextRequest,
    ListTasksRequest, Result, SourceType, SuggestionOutcome, TaskDraft, TaskView,
};
use smarttodo_db::Repositories;
use smarttodo_inference::{ContextAnalyzer, SuggestionClient};

use crate::batch::{BatchCoordinator, BatchReport};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::context::ContextService;
use crate::prioritizer::{PrioritizationEngine, SuggestionTarget};
use crate::registry::CategoryRegistry;

/// Wired-up engine.
pub struct SmartTodo {
    engine: Arc<PrioritizationEngine>,
    batch: BatchCoordinator,
    registry: Arc<CategoryRegistry>,
    context: ContextService,
    backend: Option<Arc<dyn GenerationBackend>>,
}

impl SmartTodo {
    /// Build the engine over `repos`. Without a backend every AI call
    /// degrades to unavailable.
    pub fn new(
        repos: Repositories,
        backend: Option<Arc<dyn GenerationBackend>>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(repos, backend, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repos: Repositories,
        backend: Option<Arc<dyn GenerationBackend>>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ai_backend = backend.clone().filter(|_| config.ai_enabled);
        info!(
            subsystem = "engine",
            component = "service",
            ai_enabled = ai_backend.is_some(),
            model = ai_backend.as_ref().map(|b| b.model_name()).unwrap_or("none"),
            batch_concurrency = config.batch_concurrency,
            analysis_mode = ?config.context_analysis_mode,
            "Engine initialized"
        );

        let registry = Arc::new(CategoryRegistry::new(repos.categories.clone()));
        let analyzer = match &ai_backend {
            Some(b) => ContextAnalyzer::new(b.clone()).with_timeout(config.ai_call_timeout),
            None => ContextAnalyzer::heuristic_only(),
        };
        let context = ContextService::new(
            repos.context.clone(),
            analyzer,
            config.context_analysis_mode,
            clock.clone(),
        );
        let engine = Arc::new(PrioritizationEngine::new(
            repos.tasks,
            repos.context,
            registry.clone(),
            backend.clone().map(SuggestionClient::new),
            config,
            clock,
        ));
        let batch = BatchCoordinator::new(engine.clone());

        Self {
            engine,
            batch,
            registry,
            context,
            backend,
        }
    }

    // ─── Tasks ────────────────────────────────────────────────────────────

    pub async fn create_or_update_task(
        &self,
        draft: TaskDraft,
        options: ApplyOptions,
    ) -> Result<Enrichment> {
        self.engine.create_or_update_task(draft, options).await
    }

    pub async fn set_priority(&self, task_id: i64, score: i32) -> Result<TaskView> {
        self.engine.set_priority(task_id, score).await
    }

    pub async fn assign_category_by_name(&self, task_id: i64, name: &str) -> Result<TaskView> {
        self.engine.assign_category_by_name(task_id, name).await
    }

    pub async fn complete_task(&self, task_id: i64) -> Result<TaskView> {
        self.engine.complete_task(task_id).await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<TaskView> {
        self.engine.get_task(task_id).await
    }

    pub async fn list_tasks(&self, req: ListTasksRequest) -> Result<Vec<TaskView>> {
        self.engine.list_tasks(req).await
    }

    pub async fn get_ai_suggestions(
        &self,
        target: SuggestionTarget,
        context_ids: &[i64],
    ) -> Result<SuggestionOutcome> {
        self.engine.get_ai_suggestions(target, context_ids).await
    }

    pub async fn batch_prioritize(&self, task_ids: &[i64]) -> Result<BatchReport> {
        self.batch.batch_prioritize(task_ids).await
    }

    pub async fn batch_prioritize_within(
        &self,
        task_ids: &[i64],
        budget: Duration,
    ) -> Result<BatchReport> {
        self.batch.batch_prioritize_within(task_ids, budget).await
    }

    // ─── Categories ───────────────────────────────────────────────────────

    pub async fn increment_usage(&self, category_id: i64) -> Result<Category> {
        self.registry.increment_usage(category_id).await
    }

    pub async fn decrement_usage(&self, category_id: i64) -> Result<Category> {
        self.registry.decrement_usage(category_id).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.registry.list().await
    }

    // ─── Context ──────────────────────────────────────────────────────────

    pub async fn submit_context(
        &self,
        content: &str,
        source_type: SourceType,
    ) -> Result<ContextEntry> {
        self.context.submit_context(content, source_type).await
    }

    pub async fn reanalyze_context(&self, id: i64) -> Result<ContextEntry> {
        self.context.reanalyze_context(id).await
    }

    pub async fn list_context(&self, req: ListContextRequest) -> Result<Vec<ContextEntry>> {
        self.context.list_context(req).await
    }

    /// Wait for background context analysis, e.g. before process exit.
    pub async fn wait_for_background(&self) {
        self.context.wait_for_background().await
    }

    // ─── Health ───────────────────────────────────────────────────────────

    /// `None` when no generation backend is configured.
    pub async fn health_check(&self) -> Option<Result<bool>> {
        match &self.backend {
            Some(backend) => Some(backend.health_check().await),
            None => None,
        }
    }
}
