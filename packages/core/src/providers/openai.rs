//! OpenAI implementation of the Embedder and Completion clients (§4.C, §4.D).
//!
//! A reference implementation wrapping [`openai_client::OpenAIClient`] with
//! retry/backoff, dimension checking, and a bounded embedding cache.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, StructuredRequest};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{CompletionError, EmbedderError};
use crate::providers::retry::{with_retry, Attempt};
use crate::traits::{CompletionClient, CompletionResult, EmbedderClient, EmbedderResult};
use crate::types::CoreConfig;

fn cache_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Bounded cache of embeddings keyed by `SHA-256(text)` (§4.C: "reusable
/// across documents"). Evicts least-recently-used on overflow.
struct EmbeddingCache {
    capacity: usize,
    entries: Mutex<(std::collections::HashMap<String, Vec<f32>>, VecDeque<String>)>,
}

impl EmbeddingCache {
    fn new(capacity: usize) -> Self {
        Self { capacity, entries: Mutex::new((std::collections::HashMap::new(), VecDeque::new())) }
    }

    fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut guard = self.entries.lock().unwrap();
        let value = guard.0.get(key).cloned();
        if value.is_some() {
            guard.1.retain(|k| k != key);
            guard.1.push_back(key.to_string());
        }
        value
    }

    fn put(&self, key: String, value: Vec<f32>) {
        let mut guard = self.entries.lock().unwrap();
        if !guard.0.contains_key(&key) && guard.0.len() >= self.capacity {
            if let Some(oldest) = guard.1.pop_front() {
                guard.0.remove(&oldest);
            }
        }
        guard.1.retain(|k| k != &key);
        guard.1.push_back(key.clone());
        guard.0.insert(key, value);
    }
}

/// OpenAI-backed [`EmbedderClient`] and [`CompletionClient`].
pub struct OpenAiProvider {
    client: OpenAIClient,
    config: CoreConfig,
    cache: EmbeddingCache,
}

impl OpenAiProvider {
    pub fn new(client: OpenAIClient, config: CoreConfig) -> Self {
        let cache = EmbeddingCache::new(config.embedding_cache_capacity);
        Self { client, config, cache }
    }

    /// Build from the `OPENAI_API_KEY` environment variable and default
    /// configuration.
    pub fn from_env(config: CoreConfig) -> crate::error::Result<Self> {
        let client = OpenAIClient::from_env()
            .map_err(|e| EmbedderError::ResponseMalformed(e.to_string()))?;
        Ok(Self::new(client, config))
    }

    async fn embed_uncached(&self, text: &str, cancel: &CancellationToken) -> EmbedderResult<Vec<f32>> {
        let model = self.config.embedding_model.clone();
        let outcome = with_retry(self.config.retry_budget, self.config.retry_base_delay, cancel, || async {
            if cancel.is_cancelled() {
                return Attempt::Terminal(EmbedderError::Cancelled);
            }
            match tokio::time::timeout(self.config.embedding_timeout, self.client.create_embedding(text, &model)).await
            {
                Ok(Ok(vector)) => Attempt::Ok(vector),
                Ok(Err(e)) => Attempt::Retryable(EmbedderError::ResponseMalformed(e.to_string())),
                Err(_) => Attempt::Retryable(EmbedderError::ResponseMalformed("request timed out".to_string())),
            }
        })
        .await;

        let vector = outcome.map_err(|_| EmbedderError::ProviderUnavailable)?;
        if vector.len() != self.config.embedding_dimension {
            return Err(EmbedderError::ResponseMalformed(format!(
                "expected dimension {}, got {}",
                self.config.embedding_dimension,
                vector.len()
            )));
        }
        Ok(vector)
    }
}

#[async_trait]
impl EmbedderClient for OpenAiProvider {
    #[instrument(skip(self, text, cancel))]
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> EmbedderResult<Vec<f32>> {
        let key = cache_key(text);
        if let Some(vector) = self.cache.get(&key) {
            debug!("embedding cache hit");
            return Ok(vector);
        }

        let vector = self.embed_uncached(text, cancel).await?;
        self.cache.put(key, vector.clone());
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }
}

#[async_trait]
impl CompletionClient for OpenAiProvider {
    #[instrument(skip(self, system, user, schema_hint, cancel))]
    async fn complete(
        &self,
        system: &str,
        user: &str,
        schema_hint: Option<&serde_json::Value>,
        cancel: &CancellationToken,
    ) -> CompletionResult<String> {
        let model = self.config.completion_model.clone();
        let timeout = self.config.completion_timeout;

        let outcome = with_retry(self.config.retry_budget, self.config.retry_base_delay, cancel, || async {
            if cancel.is_cancelled() {
                return Attempt::Terminal(CompletionError::Cancelled);
            }

            let call = async {
                if let Some(schema) = schema_hint {
                    let request = StructuredRequest::new(&model, system, user, schema.clone());
                    self.client.structured_output(request).await
                } else {
                    let request = ChatRequest::new(&model)
                        .message(Message::system(system))
                        .message(Message::user(user))
                        .temperature(0.0);
                    self.client.chat_completion(request).await.map(|r| r.content)
                }
            };

            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(content)) => Attempt::Ok(content),
                Ok(Err(e)) => {
                    warn!(error = %e, "completion provider error");
                    Attempt::Retryable(CompletionError::ResponseMalformed(e.to_string()))
                }
                Err(_) => Attempt::Retryable(CompletionError::ResponseMalformed("request timed out".to_string())),
            }
        })
        .await;

        outcome.map_err(|_| CompletionError::ProviderUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_evicts_oldest_entry_past_capacity() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".to_string(), vec![1.0]);
        cache.put("b".to_string(), vec![2.0]);
        cache.put("c".to_string(), vec![3.0]);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn cache_get_refreshes_recency() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".to_string(), vec![1.0]);
        cache.put("b".to_string(), vec![2.0]);
        cache.get("a");
        cache.put("c".to_string(), vec![3.0]);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn cache_key_is_stable_sha256_hex() {
        let key = cache_key("inverter 31");
        assert_eq!(key.len(), 64);
        assert_eq!(key, cache_key("inverter 31"));
    }
}
