//! Structured logging schema and field name constants for smarttodo.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same field names in every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, which value came from where |
//! | TRACE | Per-item iteration, prompts and raw responses |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "db", "inference", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "prioritizer", "registry", "batch", "suggestion", "analyzer"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "apply_to_task", "set_priority", "batch_prioritize"
pub const OPERATION: &str = "op";

/// Correlation ID for one batch run (UUIDv7).
pub const BATCH_ID: &str = "batch_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Task ID being operated on.
pub const TASK_ID: &str = "task_id";

/// Category ID being operated on.
pub const CATEGORY_ID: &str = "category_id";

/// Context entry ID being operated on.
pub const CONTEXT_ID: &str = "context_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query or batch.
pub const RESULT_COUNT: &str = "result_count";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
