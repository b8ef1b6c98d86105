//! # smarttodo-engine
//!
//! Task enrichment and prioritization for smarttodo.
//!
//! This crate provides:
//! - Category Registry: name resolution and usage counters
//! - Prioritization Engine: merges explicit input, AI suggestions and
//!   stored state into the final task
//! - Batch Coordinator: bounded-concurrency re-prioritization with
//!   per-task failure isolation
//! - Context service: stores context entries and runs the analyzer
//! - [`SmartTodo`]: one facade over all of the above
//!
//! ## Example
//!
//! ```rust,ignore
//! use smarttodo_db::Repositories;
//! use smarttodo_engine::{EngineConfig, SmartTodo};
//!
//! let todo = SmartTodo::new(Repositories::in_memory(), None, EngineConfig::default());
//! let created = todo
//!     .create_or_update_task(TaskDraft::new("Pay rent"), ApplyOptions::with_ai())
//!     .await?;
//! ```

pub mod batch;
pub mod clock;
pub mod config;
pub mod context;
pub mod locks;
pub mod prioritizer;
pub mod registry;
pub mod service;

// Re-export core types
pub use smarttodo_core::*;

pub use batch::{BatchCoordinator, BatchItemResult, BatchReport};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AnalysisMode, EngineConfig};
pub use context::ContextService;
pub use prioritizer::{PrioritizationEngine, SuggestionTarget};
pub use registry::CategoryRegistry;
pub use service::SmartTodo;
