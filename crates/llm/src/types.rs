//! Model identifier types.
//!
//! Models are named `<provider>/<model>`, e.g. `openai/gpt-4.1-nano` or
//! `ollama/llama3.2`. A bare model name is routed to OpenAI.

use augur_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "ollama" | "ollama_chat" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Whether the provider refuses requests without an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI)
    }
}

/// A provider-qualified model identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelId {
    pub provider: ProviderType,
    pub name: String,
}

impl ModelId {
    pub fn new(provider: ProviderType, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }
}

impl FromStr for ModelId {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        let s = s.trim();
        let (provider, name) = match s.split_once('/') {
            Some((provider, name)) => {
                let provider = ProviderType::parse(provider).ok_or_else(|| {
                    AppError::Config(format!("Unknown provider '{}' in model '{}'", provider, s))
                })?;
                (provider, name)
            }
            None => (ProviderType::OpenAI, s),
        };

        if name.trim().is_empty() {
            return Err(AppError::Config(format!("Model name missing in '{}'", s)));
        }

        Ok(Self::new(provider, name))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider.as_str(), self.name)
    }
}
