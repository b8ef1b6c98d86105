//! # smarttodo-inference
//!
//! Language-model plumbing for smarttodo.
//!
//! This crate provides:
//! - OpenAI-compatible chat-completion backend (feature `openai`, default),
//!   pointed at LM Studio's local server unless configured otherwise
//! - AI Suggestion Client: prompt building, bounded call, tolerant parsing
//! - Context Analyzer: local urgency/deadline heuristics plus AI insights
//! - Mock generation backend (feature `mock`)
//!
//! Neither the suggestion client nor the analyzer returns an error when the
//! model fails. Failures become `SuggestionOutcome::Unavailable` or insights
//! marked unavailable.

pub mod analysis;
pub mod heuristics;
pub mod parse;
pub mod suggestion;

#[cfg(feature = "openai")]
pub mod openai;

// Mock generation backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use smarttodo_core::*;

#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};

pub use analysis::ContextAnalyzer;
pub use parse::{extract_json_object, parse_suggestion};
pub use suggestion::{SuggestionClient, SuggestionInput};
