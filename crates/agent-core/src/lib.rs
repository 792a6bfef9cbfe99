//! # agent-core
//!
//! Provider-agnostic LLM agent with an extensible tool system and
//! conversation memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │  ┌──────┴──────────────┐                                     │
//! │  │ Session / Conversation (buffer memory)                    │
//! │  └─────────────────────┘                                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait keeps the agent independent of the inference
//! backend; tools are registered at runtime by the domain crates.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{
    Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo, TokenUsage,
};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use session::{DEFAULT_SESSION_CAPACITY, MemorySessionStore, Session, SessionId, SessionStore};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
