//! # agent-runtime
//!
//! Inference providers for the advisor agent.
//!
//! - **Ollama** (default feature): local inference through `ollama-rs`
//!
//! ```rust,ignore
//! use agent_runtime::OllamaProvider;
//!
//! let provider = Arc::new(OllamaProvider::from_env());
//! let agent = AgentBuilder::new().provider(provider).build()?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

pub use agent_core::{AgentError, LlmProvider, Message, Result, Role};
