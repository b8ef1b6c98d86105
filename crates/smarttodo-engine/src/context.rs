//! Context ingestion.
//!
//! Submission stores the entry first, so analysis problems can never lose
//! it. Analysis then runs inline or on a spawned task depending on
//! [`AnalysisMode`]; in background mode the returned entry has no insights
//! yet.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use smarttodo_core::{
    ContextEntry, ContextRepository, Error, ListContextRequest, NewContextEntry, Result,
    SourceType,
};
use smarttodo_inference::ContextAnalyzer;

use crate::clock::Clock;
use crate::config::AnalysisMode;

pub struct ContextService {
    repo: Arc<dyn ContextRepository>,
    analyzer: ContextAnalyzer,
    mode: AnalysisMode,
    clock: Arc<dyn Clock>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ContextService {
    pub fn new(
        repo: Arc<dyn ContextRepository>,
        analyzer: ContextAnalyzer,
        mode: AnalysisMode,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            analyzer,
            mode,
            clock,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Store a context entry and analyze it.
    pub async fn submit_context(
        &self,
        content: &str,
        source_type: SourceType,
    ) -> Result<ContextEntry> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("context content cannot be empty".into()));
        }

        let entry = self
            .repo
            .insert(NewContextEntry {
                content: content.to_string(),
                source_type,
                processed_insights: None,
            })
            .await?;
        info!(
            subsystem = "engine",
            component = "context",
            op = "submit_context",
            context_id = entry.id,
            source_type = %source_type,
            mode = ?self.mode,
            "Context entry stored"
        );

        match self.mode {
            AnalysisMode::Inline => {
                analyze_and_store(&self.repo, &self.analyzer, &entry, self.clock.today()).await
            }
            AnalysisMode::Background => {
                let repo = self.repo.clone();
                let analyzer = self.analyzer.clone();
                let today = self.clock.today();
                let stored = entry.clone();
                let handle = tokio::spawn(async move {
                    if let Err(e) = analyze_and_store(&repo, &analyzer, &stored, today).await {
                        error!(
                            subsystem = "engine",
                            component = "context",
                            context_id = stored.id,
                            error = %e,
                            "Failed to store context insights"
                        );
                    }
                });
                let mut pending = self.pending.lock().await;
                pending.retain(|h| !h.is_finished());
                pending.push(handle);
                Ok(entry)
            }
        }
    }

    /// Run analysis again, replacing whatever insights the entry had.
    pub async fn reanalyze_context(&self, id: i64) -> Result<ContextEntry> {
        let entry = self.repo.fetch(id).await?;
        analyze_and_store(&self.repo, &self.analyzer, &entry, self.clock.today()).await
    }

    pub async fn get_context(&self, id: i64) -> Result<ContextEntry> {
        self.repo.fetch(id).await
    }

    pub async fn list_context(&self, req: ListContextRequest) -> Result<Vec<ContextEntry>> {
        if let (Some(start), Some(end)) = (req.start, req.end) {
            if start > end {
                return Err(Error::InvalidInput(
                    "context window start is after its end".into(),
                ));
            }
        }
        self.repo.list(req).await
    }

    /// Wait for every background analysis started so far.
    pub async fn wait_for_background(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.pending.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(
                    subsystem = "engine",
                    component = "context",
                    error = %e,
                    "Background analysis task panicked"
                );
            }
        }
    }
}

async fn analyze_and_store(
    repo: &Arc<dyn ContextRepository>,
    analyzer: &ContextAnalyzer,
    entry: &ContextEntry,
    today: chrono::NaiveDate,
) -> Result<ContextEntry> {
    let insights = analyzer
        .analyze(&entry.content, entry.source_type, today)
        .await;
    info!(
        subsystem = "engine",
        component = "context",
        op = "analyze_context",
        context_id = entry.id,
        available = insights.is_available(),
        urgency = %insights.urgency.level,
        "Context analyzed"
    );
    repo.set_insights(entry.id, &insights).await
}
