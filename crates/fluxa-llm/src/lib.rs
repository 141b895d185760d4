//! Generation backends and content sources for fluxa.
//!
//! [`ChatBackend`] calls an OpenAI-compatible chat completions endpoint.
//! [`AgentBackend`] runs the `claude` CLI against a local documentation
//! folder. Both implement [`fluxa_core::orchestrator::GenerationBackend`].

pub mod agent;
pub mod chat;
pub mod error;
pub mod prompt;
pub mod web;

pub use agent::AgentBackend;
pub use chat::{ChatBackend, ChatMessage};
pub use error::{LlmError, Result};
pub use web::fetch_web_article;
