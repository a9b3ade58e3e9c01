//! In-memory response cache keyed by request content.

use crate::client::{LlmRequest, LlmResponse};
use augur_core::AppResult;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local cache of completions.
///
/// Two requests share an entry only if model, messages and sampling
/// parameters are all identical.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, LlmResponse>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// SHA-256 of the serialized request.
    pub fn key(request: &LlmRequest) -> AppResult<String> {
        let serialized = serde_json::to_string(request)?;
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub async fn get(&self, key: &str) -> Option<LlmResponse> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: String, response: LlmResponse) {
        self.entries.write().await.insert(key, response);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
