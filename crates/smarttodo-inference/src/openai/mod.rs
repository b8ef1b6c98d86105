//! OpenAI-compatible inference backend.
//!
//! Works with any endpoint speaking the chat-completions protocol:
//!
//! - LM Studio (default, `http://localhost:1234/v1`)
//! - Ollama (in OpenAI compatibility mode)
//! - vLLM, LocalAI
//! - OpenAI cloud API
//!
//! # Example
//!
//! ```rust,no_run
//! use smarttodo_inference::openai::{OpenAIBackend, OpenAIConfig};
//!
//! // From environment variables
//! let backend = OpenAIBackend::from_env().unwrap();
//!
//! // Or with custom config
//! let config = OpenAIConfig {
//!     base_url: "http://localhost:11434/v1".to_string(),
//!     gen_model: "llama3".to_string(),
//!     ..Default::default()
//! };
//! let backend = OpenAIBackend::new(config).unwrap();
//! ```

mod backend;
mod error;
mod types;

pub use backend::{
    OpenAIBackend, OpenAIConfig, DEFAULT_GEN_MODEL, DEFAULT_OPENAI_URL, DEFAULT_TIMEOUT_SECS,
};
pub use error::{to_smarttodo_error, OpenAIErrorCode};
pub use types::*;
