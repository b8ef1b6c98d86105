//! Batch Coordinator.
//!
//! Runs the prioritization engine with AI over a list of task ids with
//! bounded concurrency. Every id yields exactly one result, in input order.
//! A failing id never stops the others. With a deadline, items not yet
//! started when it passes become `Cancelled` failures; items already running
//! have their AI call cut short at the deadline and still finish their
//! writes, so a reported result always matches what was stored.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use smarttodo_core::{defaults, ApplyOptions, Enrichment, Error, ErrorKind, Result, TaskDraft};

use crate::prioritizer::PrioritizationEngine;

/// Outcome for one id of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BatchItemResult {
    Success(Enrichment),
    Failure {
        id: i64,
        kind: ErrorKind,
        message: String,
    },
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// All results of one batch run, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Correlation id, also logged as `batch_id`.
    pub batch_id: Uuid,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

pub struct BatchCoordinator {
    engine: Arc<PrioritizationEngine>,
    concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(engine: Arc<PrioritizationEngine>) -> Self {
        let concurrency = engine.config().batch_concurrency.max(1);
        Self {
            engine,
            concurrency,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Re-prioritize every id. Duplicates run one after another.
    pub async fn batch_prioritize(&self, task_ids: &[i64]) -> Result<BatchReport> {
        self.run(task_ids, None).await
    }

    /// Like [`Self::batch_prioritize`], bounded by `budget`.
    pub async fn batch_prioritize_within(
        &self,
        task_ids: &[i64],
        budget: Duration,
    ) -> Result<BatchReport> {
        self.run(task_ids, Some(tokio::time::Instant::now() + budget))
            .await
    }

    async fn run(
        &self,
        task_ids: &[i64],
        deadline: Option<tokio::time::Instant>,
    ) -> Result<BatchReport> {
        if task_ids.len() > defaults::BATCH_MAX_IDS {
            return Err(Error::InvalidInput(format!(
                "batch accepts at most {} ids, got {}",
                defaults::BATCH_MAX_IDS,
                task_ids.len()
            )));
        }

        let batch_id = Uuid::now_v7();
        let start = Instant::now();
        info!(
            subsystem = "engine",
            component = "batch",
            op = "batch_prioritize",
            %batch_id,
            task_count = task_ids.len(),
            concurrency = self.concurrency,
            "Batch started"
        );

        // `buffered` yields in input order regardless of completion order.
        let results: Vec<BatchItemResult> = stream::iter(task_ids.iter().copied())
            .map(|id| self.process_one(batch_id, id, deadline))
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = BatchReport { batch_id, results };
        info!(
            subsystem = "engine",
            component = "batch",
            op = "batch_prioritize",
            %batch_id,
            result_count = report.results.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch finished"
        );
        Ok(report)
    }

    async fn process_one(
        &self,
        batch_id: Uuid,
        id: i64,
        deadline: Option<tokio::time::Instant>,
    ) -> BatchItemResult {
        let draft = TaskDraft::for_update(id);
        let outcome = match deadline {
            Some(at) if tokio::time::Instant::now() >= at => {
                return BatchItemResult::Failure {
                    id,
                    kind: ErrorKind::Cancelled,
                    message: "batch deadline passed before this task started".into(),
                }
            }
            Some(at) => {
                self.engine
                    .create_or_update_task_by(draft, ApplyOptions::with_ai(), at)
                    .await
            }
            None => {
                self.engine
                    .create_or_update_task(draft, ApplyOptions::with_ai())
                    .await
            }
        };

        match outcome {
            Ok(enrichment) => {
                debug!(
                    subsystem = "engine",
                    component = "batch",
                    %batch_id,
                    task_id = id,
                    "Batch item succeeded"
                );
                BatchItemResult::Success(enrichment)
            }
            Err(e) => {
                warn!(
                    subsystem = "engine",
                    component = "batch",
                    %batch_id,
                    task_id = id,
                    error = %e,
                    "Batch item failed"
                );
                BatchItemResult::Failure {
                    id,
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }
}
