//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use smarttodo_core::{defaults, Error, PriorityThresholds, Result};

/// When context entries are analyzed relative to their submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Analyze before `submit_context` returns.
    Inline,
    /// Return the stored entry immediately and analyze on a spawned task.
    #[default]
    Background,
}

impl std::str::FromStr for AnalysisMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inline" | "sync" => Ok(Self::Inline),
            "background" | "async" => Ok(Self::Background),
            _ => Err(Error::Config(format!(
                "invalid context analysis mode '{s}': must be inline or background"
            ))),
        }
    }
}

/// Configuration for the prioritization engine and its collaborators.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tier table applied on every read.
    pub thresholds: PriorityThresholds,
    /// Score used when neither the caller nor the AI supplies one.
    pub baseline_score: i32,
    /// Master switch for AI consultation.
    pub ai_enabled: bool,
    /// Bound on each AI call made by the engine.
    pub ai_call_timeout: Duration,
    /// Tasks prioritized concurrently by a batch run.
    pub batch_concurrency: usize,
    pub context_analysis_mode: AnalysisMode,
    /// Deadline given to new tasks that end up without one.
    pub default_deadline_days: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: PriorityThresholds::default(),
            baseline_score: defaults::PRIORITY_BASELINE,
            ai_enabled: true,
            ai_call_timeout: Duration::from_secs(defaults::AI_TIMEOUT_SECS),
            batch_concurrency: defaults::BATCH_CONCURRENCY,
            context_analysis_mode: AnalysisMode::default(),
            default_deadline_days: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} has an invalid value: '{v}'"))),
        _ => Ok(None),
    }
}

impl EngineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `PRIORITY_BASELINE` | `50` | Score when nothing else supplies one |
    /// | `PRIORITY_MEDIUM_MIN` | `34` | Lowest medium-tier score |
    /// | `PRIORITY_HIGH_MIN` | `67` | Lowest high-tier score |
    /// | `AI_ENABLED` | `true` | Consult the model at all |
    /// | `AI_CALL_TIMEOUT_SECS` | `30` | Bound on one AI call |
    /// | `BATCH_CONCURRENCY` | `4` | Parallel tasks per batch (min 1) |
    /// | `CONTEXT_ANALYSIS_MODE` | `background` | `inline` or `background` |
    /// | `DEFAULT_DEADLINE_DAYS` | unset | Deadline offset for new tasks |
    pub fn from_env() -> Result<Self> {
        let base = Self::default();

        let thresholds = PriorityThresholds::new(
            env_parse("PRIORITY_MEDIUM_MIN")?.unwrap_or(base.thresholds.medium_min),
            env_parse("PRIORITY_HIGH_MIN")?.unwrap_or(base.thresholds.high_min),
        )?;

        let ai_enabled = std::env::var("AI_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let config = Self {
            thresholds,
            baseline_score: env_parse("PRIORITY_BASELINE")?.unwrap_or(base.baseline_score),
            ai_enabled,
            ai_call_timeout: env_parse::<u64>("AI_CALL_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(base.ai_call_timeout),
            batch_concurrency: env_parse::<usize>("BATCH_CONCURRENCY")?
                .unwrap_or(base.batch_concurrency)
                .max(1),
            context_analysis_mode: env_parse("CONTEXT_ANALYSIS_MODE")?
                .unwrap_or(base.context_analysis_mode),
            default_deadline_days: env_parse("DEFAULT_DEADLINE_DAYS")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if !(defaults::PRIORITY_MIN..=defaults::PRIORITY_MAX).contains(&self.baseline_score) {
            return Err(Error::Config(format!(
                "baseline score must be within {}..={}, got {}",
                defaults::PRIORITY_MIN,
                defaults::PRIORITY_MAX,
                self.baseline_score
            )));
        }
        if self.batch_concurrency == 0 {
            return Err(Error::Config("batch concurrency must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_thresholds(mut self, thresholds: PriorityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_baseline_score(mut self, score: i32) -> Self {
        self.baseline_score = score;
        self
    }

    pub fn with_ai_enabled(mut self, enabled: bool) -> Self {
        self.ai_enabled = enabled;
        self
    }

    pub fn with_ai_call_timeout(mut self, timeout: Duration) -> Self {
        self.ai_call_timeout = timeout;
        self
    }

    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_context_analysis_mode(mut self, mode: AnalysisMode) -> Self {
        self.context_analysis_mode = mode;
        self
    }

    pub fn with_default_deadline_days(mut self, days: Option<u32>) -> Self {
        self.default_deadline_days = days;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.baseline_score, 50);
        assert_eq!(config.thresholds, PriorityThresholds::default());
        assert!(config.ai_enabled);
        assert_eq!(config.batch_concurrency, 4);
        assert_eq!(config.context_analysis_mode, AnalysisMode::Background);
        assert!(config.default_deadline_days.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_baseline() {
        let config = EngineConfig::default().with_baseline_score(101);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_batch_concurrency_floor() {
        let config = EngineConfig::default().with_batch_concurrency(0);
        assert_eq!(config.batch_concurrency, 1);
    }

    #[test]
    fn test_analysis_mode_parse() {
        assert_eq!("inline".parse::<AnalysisMode>().unwrap(), AnalysisMode::Inline);
        assert_eq!(
            "Background".parse::<AnalysisMode>().unwrap(),
            AnalysisMode::Background
        );
        assert!("later".parse::<AnalysisMode>().is_err());
    }
}
