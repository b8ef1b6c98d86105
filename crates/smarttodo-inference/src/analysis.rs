//! Context Analyzer: turns a raw note, message or email into insights.
//!
//! Urgency cues and deadline phrases come from [`crate::heuristics`] and are
//! always present. Keywords, entities, sentiment, a summary and a suggested
//! deadline come from one bounded model call; when that call fails, times
//! out or returns nothing usable, the insights are marked unavailable with
//! the reason instead of the analysis failing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use smarttodo_core::{
    defaults, AnalysisStatus, ContextInsights, GenerationBackend, GenerationOptions, Sentiment,
    SourceType, UrgencyLevel,
};

use crate::heuristics::{detect_urgency, earliest_deadline, find_deadline_phrases};
use crate::parse::{extract_json_object, lookup, parse_deadline, parse_string_list, parse_text};

const SYSTEM_PROMPT: &str = "You analyze personal notes, messages and emails for a task manager. \
Reply with a single JSON object and nothing else.";

const MAX_KEYWORDS: usize = 8;

/// Analyzes context entries.
#[derive(Clone)]
pub struct ContextAnalyzer {
    backend: Option<Arc<dyn GenerationBackend>>,
    timeout: Duration,
    options: GenerationOptions,
}

impl ContextAnalyzer {
    /// Analyzer backed by a generation model.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend: Some(backend),
            timeout: Duration::from_secs(defaults::AI_TIMEOUT_SECS),
            options: GenerationOptions::new(
                defaults::ANALYSIS_TEMPERATURE,
                defaults::ANALYSIS_MAX_TOKENS,
            ),
        }
    }

    /// Analyzer that only runs the local heuristics.
    pub fn heuristic_only() -> Self {
        Self {
            backend: None,
            timeout: Duration::from_secs(defaults::AI_TIMEOUT_SECS),
            options: GenerationOptions::new(
                defaults::ANALYSIS_TEMPERATURE,
                defaults::ANALYSIS_MAX_TOKENS,
            ),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    fn build_prompt(content: &str, source_type: SourceType, today: NaiveDate) -> String {
        format!(
            "Today is {today}.\n\
             Source: {source_type}\n\n\
             Content:\n{content}\n\n\
             Return JSON with these keys:\n\
             - keywords: array of up to {MAX_KEYWORDS} short topic strings\n\
             - entities: array of people, organisations or projects mentioned\n\
             - sentiment: \"positive\", \"negative\" or \"neutral\"\n\
             - urgency: \"none\", \"low\", \"medium\" or \"high\"\n\
             - deadline: YYYY-MM-DD if the text implies one on or after today, else null\n\
             - summary: one sentence"
        )
    }

    /// Analyze `content`. Never fails; see [`ContextInsights::status`].
    pub async fn analyze(
        &self,
        content: &str,
        source_type: SourceType,
        today: NaiveDate,
    ) -> ContextInsights {
        let mut insights = ContextInsights {
            status: AnalysisStatus::Unavailable,
            unavailable_reason: None,
            urgency: detect_urgency(content),
            deadline_phrases: find_deadline_phrases(content),
            suggested_deadline: None,
            keywords: Vec::new(),
            entities: Vec::new(),
            sentiment: None,
            summary: None,
            analyzed_at: Utc::now(),
        };
        let heuristic_deadline = earliest_deadline(&insights.deadline_phrases, today);

        let raw = match self.call_model(content, source_type, today).await {
            Ok(raw) => raw,
            Err(reason) => {
                warn!(
                    subsystem = "inference",
                    component = "analyzer",
                    op = "analyze",
                    error = %reason,
                    "Context analysis unavailable, keeping heuristics only"
                );
                insights.unavailable_reason = Some(reason);
                insights.suggested_deadline = heuristic_deadline;
                return insights;
            }
        };

        let Some(obj) = extract_json_object(&raw) else {
            warn!(
                subsystem = "inference",
                component = "analyzer",
                op = "analyze",
                response_len = raw.len(),
                "Analysis response contained no JSON object"
            );
            insights.unavailable_reason = Some("response contained no JSON object".to_string());
            insights.suggested_deadline = heuristic_deadline;
            return insights;
        };

        let keywords: Vec<String> = lookup(&obj, &["keywords", "topics", "tags"])
            .map(parse_string_list)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_KEYWORDS)
            .collect();
        let entities = lookup(&obj, &["entities", "people", "names"])
            .map(parse_string_list)
            .unwrap_or_default();
        let sentiment = lookup(&obj, &["sentiment", "tone"]).and_then(parse_sentiment);
        let summary = lookup(&obj, &["summary"]).and_then(parse_text);
        let ai_urgency = lookup(&obj, &["urgency", "urgency_level"]).and_then(parse_urgency);
        let ai_deadline = lookup(&obj, &["deadline", "suggested_deadline", "due_date"])
            .and_then(|v| parse_deadline(v, today));

        let usable = !keywords.is_empty()
            || !entities.is_empty()
            || sentiment.is_some()
            || summary.is_some()
            || ai_urgency.is_some()
            || ai_deadline.is_some();
        if !usable {
            warn!(
                subsystem = "inference",
                component = "analyzer",
                op = "analyze",
                response_len = raw.len(),
                "Analysis response had no usable fields"
            );
            insights.unavailable_reason = Some("response had no usable fields".to_string());
            insights.suggested_deadline = heuristic_deadline;
            return insights;
        }

        insights.status = AnalysisStatus::Complete;
        insights.keywords = keywords;
        insights.entities = entities;
        insights.sentiment = sentiment;
        insights.summary = summary;
        if let Some(level) = ai_urgency {
            insights.urgency.level = insights.urgency.level.max(level);
        }
        insights.suggested_deadline = ai_deadline.or(heuristic_deadline);

        debug!(
            subsystem = "inference",
            component = "analyzer",
            urgency = %insights.urgency.level,
            keyword_count = insights.keywords.len(),
            ai_deadline = ai_deadline.is_some(),
            "Context analysis complete"
        );
        insights
    }

    /// One bounded model call. The error is the human-readable reason.
    async fn call_model(
        &self,
        content: &str,
        source_type: SourceType,
        today: NaiveDate,
    ) -> std::result::Result<String, String> {
        let Some(backend) = &self.backend else {
            return Err("AI analysis disabled".to_string());
        };
        if content.trim().is_empty() {
            return Err("empty content".to_string());
        }

        let prompt = Self::build_prompt(content, source_type, today);
        let start = Instant::now();
        let call = backend.generate_with_system(SYSTEM_PROMPT, &prompt, self.options);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {}s", self.timeout.as_secs_f32())),
        };
        debug!(
            subsystem = "inference",
            component = "analyzer",
            model = backend.model_name(),
            prompt_len = prompt.len(),
            success = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis call finished"
        );
        result
    }
}

fn parse_sentiment(value: &Value) -> Option<Sentiment> {
    match value.as_str()?.trim().to_lowercase().as_str() {
        "positive" => Some(Sentiment::Positive),
        "negative" => Some(Sentiment::Negative),
        "neutral" | "mixed" => Some(Sentiment::Neutral),
        _ => None,
    }
}

fn parse_urgency(value: &Value) -> Option<UrgencyLevel> {
    match value.as_str()?.trim().to_lowercase().as_str() {
        "none" => Some(UrgencyLevel::None),
        "low" => Some(UrgencyLevel::Low),
        "medium" | "moderate" => Some(UrgencyLevel::Medium),
        "high" | "urgent" | "critical" => Some(UrgencyLevel::High),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGenerationBackend;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    const EMAIL: &str = "They want it by next Friday. It seems urgent.";

    #[tokio::test]
    async fn test_ai_backed_analysis() {
        let backend = MockGenerationBackend::new().with_fixed_response(
            r#"{"keywords": ["report", "client"], "entities": ["Acme"],
                "sentiment": "Negative", "urgency": "high",
                "deadline": "2025-03-14", "summary": "Client needs the report Friday."}"#,
        );
        let analyzer = ContextAnalyzer::new(Arc::new(backend.clone()));

        let insights = analyzer.analyze(EMAIL, SourceType::Email, today()).await;

        assert!(insights.is_available());
        assert_eq!(insights.urgency.level, UrgencyLevel::High);
        assert_eq!(insights.urgency.cues, vec!["urgent".to_string()]);
        assert_eq!(insights.deadline_phrases, vec!["by next Friday".to_string()]);
        assert_eq!(
            insights.suggested_deadline,
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );
        assert_eq!(insights.keywords, vec!["report", "client"]);
        assert_eq!(insights.entities, vec!["Acme"]);
        assert_eq!(insights.sentiment, Some(Sentiment::Negative));
        assert!(insights.summary.is_some());

        let calls = backend.get_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("Source: email"));
        assert!(calls[0].prompt.contains("Today is 2025-03-10"));
        assert_eq!(calls[0].options.max_tokens, defaults::ANALYSIS_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_failure_keeps_heuristics() {
        let analyzer = ContextAnalyzer::new(Arc::new(MockGenerationBackend::failing()));

        let insights = analyzer.analyze(EMAIL, SourceType::Email, today()).await;

        assert_eq!(insights.status, AnalysisStatus::Unavailable);
        assert!(insights
            .unavailable_reason
            .as_deref()
            .unwrap()
            .contains("simulated failure"));
        assert_eq!(insights.urgency.level, UrgencyLevel::High);
        assert_eq!(insights.deadline_phrases.len(), 1);
        // Heuristic resolution of "by next Friday".
        assert_eq!(
            insights.suggested_deadline,
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );
        assert!(insights.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_marks_unavailable() {
        let backend = MockGenerationBackend::new().with_latency_ms(200);
        let analyzer =
            ContextAnalyzer::new(Arc::new(backend)).with_timeout(Duration::from_millis(20));

        let insights = analyzer.analyze(EMAIL, SourceType::Email, today()).await;

        assert_eq!(insights.status, AnalysisStatus::Unavailable);
        assert!(insights
            .unavailable_reason
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[tokio::test]
    async fn test_unparsable_response_marks_unavailable() {
        let backend = MockGenerationBackend::new().with_fixed_response("I cannot help with that.");
        let analyzer = ContextAnalyzer::new(Arc::new(backend));

        let insights = analyzer
            .analyze("call mom tomorrow", SourceType::Note, today())
            .await;

        assert_eq!(insights.status, AnalysisStatus::Unavailable);
        assert_eq!(
            insights.suggested_deadline,
            NaiveDate::from_ymd_opt(2025, 3, 11)
        );
    }

    #[tokio::test]
    async fn test_heuristic_only_never_calls_model() {
        let analyzer = ContextAnalyzer::heuristic_only();
        let insights = analyzer
            .analyze("no rush on this one", SourceType::Message, today())
            .await;
        assert_eq!(insights.status, AnalysisStatus::Unavailable);
        assert_eq!(insights.unavailable_reason.as_deref(), Some("AI analysis disabled"));
        assert_eq!(insights.urgency.level, UrgencyLevel::Low);
    }

    #[tokio::test]
    async fn test_ai_urgency_only_raises_level() {
        let backend = MockGenerationBackend::new().with_fixed_response(r#"{"urgency": "low"}"#);
        let analyzer = ContextAnalyzer::new(Arc::new(backend));
        let insights = analyzer.analyze(EMAIL, SourceType::Email, today()).await;
        assert_eq!(insights.urgency.level, UrgencyLevel::High);
    }

    #[tokio::test]
    async fn test_past_ai_deadline_falls_back_to_heuristic() {
        let backend = MockGenerationBackend::new()
            .with_fixed_response(r#"{"deadline": "2024-01-01", "summary": "Finish it."}"#);
        let analyzer = ContextAnalyzer::new(Arc::new(backend));
        let insights = analyzer
            .analyze("finish it in 3 days", SourceType::Note, today())
            .await;
        assert!(insights.is_available());
        assert_eq!(
            insights.suggested_deadline,
            NaiveDate::from_ymd_opt(2025, 3, 13)
        );
    }

    #[tokio::test]
    async fn test_empty_object_marks_unavailable() {
        for response in ["{}", r#"{"deadline": "2024-01-01", "sentiment": "meh"}"#] {
            let backend = MockGenerationBackend::new().with_fixed_response(response);
            let analyzer = ContextAnalyzer::new(Arc::new(backend));

            let insights = analyzer.analyze(EMAIL, SourceType::Email, today()).await;

            assert_eq!(insights.status, AnalysisStatus::Unavailable, "{response}");
            assert_eq!(
                insights.unavailable_reason.as_deref(),
                Some("response had no usable fields")
            );
            assert_eq!(insights.urgency.level, UrgencyLevel::High);
            assert_eq!(
                insights.suggested_deadline,
                NaiveDate::from_ymd_opt(2025, 3, 14)
            );
        }
    }
}
