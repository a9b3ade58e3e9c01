//! LLM integration crate for Augur.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs) through a unified trait-based interface, and
//! the [`Lm`] handle that binds a provider to a model.
//!
//! # Providers
//! - **OpenAI**: Chat Completions API and compatible servers
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use augur_llm::{ChatMessage, Lm};
//!
//! # async fn example() -> augur_core::AppResult<()> {
//! let lm = Lm::connect("ollama/llama3.2", None, None)?;
//! let response = lm.chat(vec![ChatMessage::user("Hello, world!")]).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod factory;
pub mod lm;
pub mod providers;
pub mod types;

// Re-export main types
pub use cache::ResponseCache;
pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage, Role};
pub use factory::create_client;
pub use lm::Lm;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::{ModelId, ProviderType};
