//! # smarttodo-core
//!
//! Core types, traits, and abstractions for the smarttodo task enrichment engine.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other smarttodo crates depend on: tasks, categories, context
//! entries, the priority tier table, the shared error type, and the
//! repository / generation backend seams.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod priority;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use models::*;
pub use priority::{PriorityThresholds, PriorityTier};
pub use traits::*;
