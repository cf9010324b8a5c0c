//! LLM provider abstraction layer
//!
//! Agents reason through a chat-completion backend. The backend is opaque to
//! the pipeline; only the [`LlmProvider`] trait is visible to agents.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
