//! Mock generation backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smarttodo_inference::mock::MockGenerationBackend;
//!
//! let backend = MockGenerationBackend::new()
//!     .with_fixed_response(r#"{"priority_score": 80}"#)
//!     .with_response_for("Pay rent", r#"{"priority_score": 95}"#);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use smarttodo_core::{Error, GenerationBackend, GenerationOptions, Result};

/// Mock generation backend for testing.
#[derive(Clone)]
pub struct MockGenerationBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    model_name: String,
    /// (needle, response): first needle contained in the prompt wins.
    mapped_responses: Vec<(String, String)>,
    default_response: String,
    latency_ms: u64,
    failure_rate: f64,
    healthy: bool,
}

/// One recorded generation request.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub prompt: String,
    pub options: GenerationOptions,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model_name: "mock-model".to_string(),
            mapped_responses: Vec::new(),
            default_response: "{}".to_string(),
            latency_ms: 0,
            failure_rate: 0.0,
            healthy: true,
        }
    }
}

impl MockGenerationBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the response returned when no mapping matches.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Return `output` for any prompt containing `needle`.
    pub fn with_response_for(
        mut self,
        needle: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .mapped_responses
            .push((needle.into(), output.into()));
        self
    }

    /// Set simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Fail every call, as an unreachable endpoint would.
    pub fn failing() -> Self {
        Self::new().with_failure_rate(1.0)
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model_name = name.into();
        self
    }

    pub fn with_health(mut self, healthy: bool) -> Self {
        Arc::make_mut(&mut self.config).healthy = healthy;
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    pub fn clear_calls(&self) {
        self.log().clear()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate_with_system(
        &self,
        system: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String> {
        self.log().push(MockCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            options,
            timestamp: std::time::Instant::now(),
        });
        self.simulate_latency().await;

        if self.should_fail() {
            return Err(Error::Inference("simulated failure".to_string()));
        }

        let mapped = self
            .config
            .mapped_responses
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone());

        Ok(mapped.unwrap_or_else(|| self.config.default_response.clone()))
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }
}
