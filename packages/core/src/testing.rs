//! Testing utilities: in-memory mock Embedder and Completion clients.
//!
//! These let pipeline logic be exercised without a real provider. Follows
//! this codebase's existing mock shape: predefined responses keyed by
//! input, call recording for assertions, deterministic fallback
//! generation for unregistered inputs.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::CompletionError;
use crate::traits::{CompletionClient, CompletionResult, EmbedderClient, EmbedderResult};

/// A mock embedder returning deterministic, SHA-256-seeded vectors.
pub struct MockEmbedderClient {
    dimension: usize,
    overrides: RwLock<HashMap<String, Vec<f32>>>,
    calls: RwLock<Vec<String>>,
}

impl MockEmbedderClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, overrides: RwLock::new(HashMap::new()), calls: RwLock::new(Vec::new()) }
    }

    pub fn with_embedding(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.overrides.write().unwrap().insert(text.into(), vector);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn deterministic(&self, text: &str) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();
        (0..self.dimension)
            .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
            .collect()
    }
}

#[async_trait]
impl EmbedderClient for MockEmbedderClient {
    async fn embed(&self, text: &str, _cancel: &CancellationToken) -> EmbedderResult<Vec<f32>> {
        self.calls.write().unwrap().push(text.to_string());
        if let Some(vector) = self.overrides.read().unwrap().get(text).cloned() {
            return Ok(vector);
        }
        Ok(self.deterministic(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// A mock completion client: returns a fixed raw string for `complete`,
/// and `T::default()` for `complete_json` unless a JSON override was
/// registered for the exact user prompt.
pub struct MockCompletionClient {
    default_response: String,
    json_overrides: RwLock<HashMap<String, serde_json::Value>>,
    fail: RwLock<bool>,
    calls: RwLock<Vec<String>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            default_response: String::new(),
            json_overrides: RwLock::new(HashMap::new()),
            fail: RwLock::new(false),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    pub fn with_json_response(self, user_prompt_contains: impl Into<String>, value: serde_json::Value) -> Self {
        self.json_overrides.write().unwrap().insert(user_prompt_contains.into(), value);
        self
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.write().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        _system: &str,
        user: &str,
        _schema_hint: Option<&serde_json::Value>,
        _cancel: &CancellationToken,
    ) -> CompletionResult<String> {
        self.calls.write().unwrap().push(user.to_string());
        if *self.fail.read().unwrap() {
            return Err(CompletionError::ProviderUnavailable);
        }

        let overrides = self.json_overrides.read().unwrap();
        for (needle, value) in overrides.iter() {
            if user.contains(needle.as_str()) {
                return Ok(value.to_string());
            }
        }
        Ok(self.default_response.clone())
    }

    async fn complete_json<T>(
        &self,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> CompletionResult<T>
    where
        T: DeserializeOwned + Default + Send,
    {
        let raw = self.complete(system, user, Some(schema), cancel).await?;
        Ok(crate::pipeline::json_repair::repair_and_parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedder_is_deterministic_for_same_text() {
        let client = MockEmbedderClient::new(8);
        let cancel = CancellationToken::new();
        let a = client.embed("hello", &cancel).await.unwrap();
        let b = client.embed("hello", &cancel).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn embedder_records_calls() {
        let client = MockEmbedderClient::new(4);
        let cancel = CancellationToken::new();
        client.embed("a", &cancel).await.unwrap();
        client.embed("b", &cancel).await.unwrap();
        assert_eq!(client.calls(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn completion_client_honors_failing_flag() {
        let client = MockCompletionClient::new();
        client.set_failing(true);
        let cancel = CancellationToken::new();
        let result = client.complete("sys", "usr", None, &cancel).await;
        assert!(matches!(result, Err(CompletionError::ProviderUnavailable)));
    }
}
