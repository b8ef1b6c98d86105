//! AI Suggestion Client.
//!
//! Builds one prompt per task, makes exactly one bounded call to the
//! generation backend and parses the reply with [`crate::parse`]. There is
//! no retry loop. Transport errors, timeouts and unusable replies all become
//! [`SuggestionOutcome::Unavailable`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, trace, warn};

use smarttodo_core::{defaults, GenerationBackend, GenerationOptions, SuggestionOutcome};

use crate::parse::parse_suggestion;

const SYSTEM_PROMPT: &str = "You are a task planning assistant. You estimate how urgent and \
important a task is and suggest a deadline, categories and a clearer description. \
Reply with a single JSON object and nothing else.";

/// Everything the model sees about one task.
#[derive(Debug, Clone)]
pub struct SuggestionInput {
    pub title: String,
    pub description: String,
    /// Rendered context insights.
    pub context_hints: Vec<String>,
    /// Existing category names the model should prefer reusing.
    pub existing_categories: Vec<String>,
    /// Anchor for relative deadlines; earlier suggested dates are dropped.
    pub today: NaiveDate,
}

impl SuggestionInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            context_hints: Vec::new(),
            existing_categories: Vec::new(),
            today,
        }
    }

    pub fn with_context_hints(mut self, hints: Vec<String>) -> Self {
        self.context_hints = hints;
        self
    }

    pub fn with_existing_categories(mut self, names: Vec<String>) -> Self {
        self.existing_categories = names;
        self
    }

    /// Render the user prompt.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!("Today is {}.\n\nTask title: {}\n", self.today, self.title);
        if !self.description.trim().is_empty() {
            prompt.push_str(&format!("Task description: {}\n", self.description.trim()));
        }

        if !self.context_hints.is_empty() {
            prompt.push_str("\nRelated context:\n");
            for hint in &self.context_hints {
                prompt.push_str(&format!("- {hint}\n"));
            }
        }

        if !self.existing_categories.is_empty() {
            prompt.push_str(&format!(
                "\nExisting categories (reuse one when it fits): {}\n",
                self.existing_categories.join(", ")
            ));
        }

        prompt.push_str(
            "\nReturn JSON with these keys:\n\
             - priority_score: integer from 0 (trivial) to 100 (critical)\n\
             - priority: \"low\", \"medium\" or \"high\"\n\
             - deadline: YYYY-MM-DD on or after today, or null\n\
             - categories: array of category names, most fitting first\n\
             - enhanced_description: a clearer, more actionable description",
        );
        prompt
    }
}

/// Client for task suggestions.
#[derive(Clone)]
pub struct SuggestionClient {
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
    options: GenerationOptions,
}

impl SuggestionClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(defaults::AI_TIMEOUT_SECS),
            options: GenerationOptions::default(),
        }
    }

    /// Bound on a single call, including connection time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Ask the model for a suggestion. Never fails.
    pub async fn suggest(&self, input: &SuggestionInput) -> SuggestionOutcome {
        let prompt = input.to_prompt();
        let start = Instant::now();
        trace!(subsystem = "inference", component = "suggestion", prompt = %prompt, "Suggestion prompt");

        let call = self
            .backend
            .generate_with_system(SYSTEM_PROMPT, &prompt, self.options);
        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(
                    subsystem = "inference",
                    component = "suggestion",
                    op = "suggest",
                    model = self.backend.model_name(),
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "AI suggestion call failed"
                );
                return SuggestionOutcome::unavailable(e.to_string());
            }
            Err(_) => {
                warn!(
                    subsystem = "inference",
                    component = "suggestion",
                    op = "suggest",
                    model = self.backend.model_name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "AI suggestion call timed out"
                );
                return SuggestionOutcome::unavailable(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f32()
                ));
            }
        };

        let outcome = parse_suggestion(&raw, input.today);
        match &outcome {
            SuggestionOutcome::Suggested(s) => debug!(
                subsystem = "inference",
                component = "suggestion",
                op = "suggest",
                model = self.backend.model_name(),
                prompt_len = prompt.len(),
                response_len = raw.len(),
                has_score = s.priority_score.is_some(),
                has_deadline = s.deadline.is_some(),
                category_count = s.categories.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "AI suggestion parsed"
            ),
            SuggestionOutcome::Unavailable { reason } => warn!(
                subsystem = "inference",
                component = "suggestion",
                op = "suggest",
                model = self.backend.model_name(),
                response_len = raw.len(),
                reason = %reason,
                "AI response unusable"
            ),
        }
        outcome
    }
}
