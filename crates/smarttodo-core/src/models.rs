//! Core data models for smarttodo.
//!
//! These types are shared across all smarttodo crates and represent
//! the core domain entities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::priority::{PriorityThresholds, PriorityTier};

// =============================================================================
// TASK TYPES
// =============================================================================

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(Error::InvalidInput(format!(
                "invalid status '{s}': must be pending, in_progress, or completed"
            ))),
        }
    }
}

/// A persisted task.
///
/// The priority tier is deliberately absent: it is derived from
/// `priority_score` on every read via [`Task::priority`] or [`TaskView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    /// Name of the linked category, joined on read.
    pub category_name: Option<String>,
    pub priority_score: i32,
    pub deadline: Option<NaiveDate>,
    pub status: TaskStatus,
    pub is_ai_suggested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Tier implied by the current score.
    pub fn priority(&self, thresholds: &PriorityThresholds) -> PriorityTier {
        thresholds.tier_for(self.priority_score)
    }

    /// Attach the derived tier for presentation.
    pub fn into_view(self, thresholds: &PriorityThresholds) -> TaskView {
        let priority = self.priority(thresholds);
        TaskView {
            task: self,
            priority,
        }
    }
}

/// A task together with its derived priority tier, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub priority: PriorityTier,
}

/// Fields for inserting a new task row.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub priority_score: i32,
    pub deadline: Option<NaiveDate>,
    pub status: TaskStatus,
    pub is_ai_suggested: bool,
}

/// Reference to a category by id or by free-text name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryRef {
    Id(i64),
    Name(String),
}

/// Caller input for creating or updating a task.
///
/// `id = None` creates a task. `id = Some(..)` updates it, and every field
/// left as `None` keeps its stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority_score: Option<i32>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn for_update(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority_score(mut self, score: i32) -> Self {
        self.priority_score = Some(score);
        self
    }

    pub fn with_category_name(mut self, name: impl Into<String>) -> Self {
        self.category = Some(CategoryRef::Name(name.into()));
        self
    }

    pub fn with_category_id(mut self, id: i64) -> Self {
        self.category = Some(CategoryRef::Id(id));
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Options controlling one create/update pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyOptions {
    /// Consult the AI suggestion client.
    #[serde(default)]
    pub apply_ai: bool,
    /// Context entries whose insights are passed to the model as hints.
    #[serde(default)]
    pub context_ids: Vec<i64>,
}

impl ApplyOptions {
    pub fn with_ai() -> Self {
        Self {
            apply_ai: true,
            context_ids: Vec::new(),
        }
    }

    pub fn without_ai() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.context_ids.extend(ids);
        self
    }
}

/// What happened to AI consultation during a create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AiStatus {
    /// AI was not consulted.
    Skipped,
    /// A suggestion was received and merged under the explicit-wins rule.
    Applied,
    /// AI was consulted but produced nothing usable.
    Unavailable { reason: String },
}

/// Result of a create/update pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub task: TaskView,
    pub ai: AiStatus,
}

// =============================================================================
// SUGGESTION TYPES
// =============================================================================

/// AI-derived candidate values. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<i32>,
    /// The model's own tier label. Informational only; tiers are always
    /// recomputed from the score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// Candidate category names, most confident first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_description: Option<String>,
}

impl Suggestion {
    /// True when no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        self.priority_score.is_none()
            && self.priority_label.is_none()
            && self.deadline.is_none()
            && self.categories.is_empty()
            && self.enhanced_description.is_none()
    }
}

/// Tagged outcome of a suggestion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SuggestionOutcome {
    Suggested(Suggestion),
    Unavailable { reason: String },
}

impl SuggestionOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn suggestion(&self) -> Option<&Suggestion> {
        match self {
            Self::Suggested(s) => Some(s),
            Self::Unavailable { .. } => None,
        }
    }
}

// =============================================================================
// CATEGORY TYPES
// =============================================================================

/// A shared task category with its usage counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Maintained by explicit increment/decrement calls, never recomputed
    /// from task links. Never negative.
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// CONTEXT TYPES
// =============================================================================

/// Origin of a context entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Note,
    Message,
    Email,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Message => "message",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "note" | "other" => Ok(Self::Note),
            "message" | "whatsapp" => Ok(Self::Message),
            "email" => Ok(Self::Email),
            _ => Err(Error::InvalidInput(format!(
                "invalid source type '{s}': must be note, message, or email"
            ))),
        }
    }
}

/// Whether the AI half of an analysis succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Urgency level plus the phrases that triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencySignal {
    pub level: UrgencyLevel,
    #[serde(default)]
    pub cues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Structured analysis of a context entry.
///
/// `urgency` and `deadline_phrases` are computed locally and are present
/// even when `status` is `Unavailable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInsights {
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
    pub urgency: UrgencySignal,
    #[serde(default)]
    pub deadline_phrases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl ContextInsights {
    pub fn is_available(&self) -> bool {
        self.status == AnalysisStatus::Complete
    }

    /// One-line rendering used as a prompt hint.
    pub fn to_hint(&self) -> String {
        let mut parts = vec![format!("urgency: {}", self.urgency.level)];
        if !self.urgency.cues.is_empty() {
            parts.push(format!("cues: {}", self.urgency.cues.join(", ")));
        }
        if !self.deadline_phrases.is_empty() {
            parts.push(format!("deadline mentions: {}", self.deadline_phrases.join(", ")));
        }
        if let Some(date) = self.suggested_deadline {
            parts.push(format!("suggested deadline: {date}"));
        }
        if !self.keywords.is_empty() {
            parts.push(format!("keywords: {}", self.keywords.join(", ")));
        }
        if let Some(summary) = &self.summary {
            parts.push(format!("summary: {summary}"));
        }
        parts.join("; ")
    }
}

/// A free-form note, message or email ingested for situational awareness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: i64,
    pub content: String,
    pub source_type: SourceType,
    pub timestamp: DateTime<Utc>,
    /// `None` until analysis has run.
    pub processed_insights: Option<ContextInsights>,
}

/// Fields for inserting a new context entry.
#[derive(Debug, Clone)]
pub struct NewContextEntry {
    pub content: String,
    pub source_type: SourceType,
    pub processed_insights: Option<ContextInsights>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(score: i32) -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            title: "Write report".into(),
            description: String::new(),
            category_id: None,
            category_name: None,
            priority_score: score,
            deadline: None,
            status: TaskStatus::Pending,
            is_ai_suggested: false,
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // TaskStatus
    // =========================================================================

    #[test]
    fn test_task_status_parse() {
        assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!(
            "In-Progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(
            "COMPLETED".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    // =========================================================================
    // Task / TaskView
    // =========================================================================

    #[test]
    fn test_task_view_derives_tier() {
        let t = PriorityThresholds::default();
        assert_eq!(sample_task(80).into_view(&t).priority, PriorityTier::High);
        assert_eq!(sample_task(50).into_view(&t).priority, PriorityTier::Medium);
        assert_eq!(sample_task(10).into_view(&t).priority, PriorityTier::Low);
    }

    #[test]
    fn test_task_view_serializes_flat() {
        let view = sample_task(80).into_view(&PriorityThresholds::default());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["priority_score"], 80);
        assert_eq!(json["title"], "Write report");
    }

    #[test]
    fn test_draft_builder() {
        let draft = TaskDraft::new("Pay rent")
            .with_description("before the 1st")
            .with_priority_score(90)
            .with_category_name("Home");
        assert_eq!(draft.title.as_deref(), Some("Pay rent"));
        assert_eq!(draft.priority_score, Some(90));
        assert_eq!(draft.category, Some(CategoryRef::Name("Home".into())));
        assert!(draft.id.is_none());
    }

    #[test]
    fn test_draft_deserializes_with_missing_fields() {
        let draft: TaskDraft = serde_json::from_str(r#"{"title":"X"}"#).unwrap();
        assert_eq!(draft.title.as_deref(), Some("X"));
        assert!(draft.description.is_none());
        assert!(draft.category.is_none());
    }

    // =========================================================================
    // Suggestion
    // =========================================================================

    #[test]
    fn test_empty_suggestion() {
        assert!(Suggestion::default().is_empty());
        let s = Suggestion {
            categories: vec!["Work".into()],
            ..Default::default()
        };
        assert!(!s.is_empty());
    }

    #[test]
    fn test_suggestion_outcome_serialization() {
        let json = serde_json::to_value(SuggestionOutcome::unavailable("timeout")).unwrap();
        assert_eq!(json["outcome"], "unavailable");
        assert_eq!(json["reason"], "timeout");
    }

    #[test]
    fn test_ai_status_serialization() {
        let json = serde_json::to_value(AiStatus::Skipped).unwrap();
        assert_eq!(json["status"], "skipped");
    }

    // =========================================================================
    // SourceType
    // =========================================================================

    #[test]
    fn test_source_type_aliases() {
        assert_eq!("WhatsApp".parse::<SourceType>().unwrap(), SourceType::Message);
        assert_eq!("EMAIL".parse::<SourceType>().unwrap(), SourceType::Email);
        assert_eq!(" note ".parse::<SourceType>().unwrap(), SourceType::Note);
        assert!(matches!(
            "fax".parse::<SourceType>(),
            Err(Error::InvalidInput(_))
        ));
    }

    // =========================================================================
    // ContextInsights
    // =========================================================================

    #[test]
    fn test_insights_hint_rendering() {
        let insights = ContextInsights {
            status: AnalysisStatus::Complete,
            unavailable_reason: None,
            urgency: UrgencySignal {
                level: UrgencyLevel::High,
                cues: vec!["urgent".into()],
            },
            deadline_phrases: vec!["by next Friday".into()],
            suggested_deadline: NaiveDate::from_ymd_opt(2025, 3, 14),
            keywords: vec!["report".into()],
            entities: vec![],
            sentiment: Some(Sentiment::Neutral),
            summary: Some("Client wants the report".into()),
            analyzed_at: Utc::now(),
        };
        let hint = insights.to_hint();
        assert!(hint.contains("urgency: high"));
        assert!(hint.contains("by next Friday"));
        assert!(hint.contains("2025-03-14"));
        assert!(hint.contains("summary: Client wants the report"));
    }

    #[test]
    fn test_urgency_level_ordering() {
        assert!(UrgencyLevel::High > UrgencyLevel::Medium);
        assert!(UrgencyLevel::Low > UrgencyLevel::None);
    }
}
