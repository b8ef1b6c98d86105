//! Centralized default constants for smarttodo.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// PRIORITY
// =============================================================================

/// Priority score assigned when neither the user nor the AI supplies one.
pub const PRIORITY_BASELINE: i32 = 50;

/// Lowest valid priority score.
pub const PRIORITY_MIN: i32 = 0;

/// Highest valid priority score.
pub const PRIORITY_MAX: i32 = 100;

/// Lowest score that maps to the medium tier.
pub const PRIORITY_MEDIUM_MIN: i32 = 34;

/// Lowest score that maps to the high tier.
pub const PRIORITY_HIGH_MIN: i32 = 67;

// =============================================================================
// TASKS & CATEGORIES
// =============================================================================

/// Maximum task title length in characters.
pub const TITLE_MAX_LEN: usize = 255;

/// Maximum category name length in characters.
pub const CATEGORY_NAME_MAX_LEN: usize = 100;

/// Number of existing category names offered to the model as reuse hints.
pub const PROMPT_CATEGORY_HINTS: usize = 20;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default OpenAI-compatible base URL (LM Studio's local server).
pub const AI_BASE_URL: &str = "http://localhost:1234/v1";

/// Default generation model name.
pub const AI_MODEL_NAME: &str = "local-model";

/// Timeout for a single generation request in seconds.
pub const AI_TIMEOUT_SECS: u64 = 30;

/// Sampling temperature for task suggestions. Low for stable scores.
pub const SUGGESTION_TEMPERATURE: f32 = 0.3;

/// Token budget for a task suggestion response.
pub const SUGGESTION_MAX_TOKENS: u32 = 400;

/// Sampling temperature for context analysis.
pub const ANALYSIS_TEMPERATURE: f32 = 0.5;

/// Token budget for a context analysis response.
pub const ANALYSIS_MAX_TOKENS: u32 = 300;

// =============================================================================
// BATCH PROCESSING
// =============================================================================

/// Default number of tasks prioritized concurrently in a batch.
pub const BATCH_CONCURRENCY: usize = 4;

/// Maximum number of task ids accepted in one batch call.
pub const BATCH_MAX_IDS: usize = 500;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list operations.
pub const PAGE_LIMIT: i64 = 50;
