//! Embedder Client trait (§4.C).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::EmbedderError;

pub type EmbedderResult<T> = std::result::Result<T, EmbedderError>;

/// Wraps the embedding provider's RPC. Implementations own batching,
/// retry/backoff, dimension checking, and caching (§4.C).
#[async_trait]
pub trait EmbedderClient: Send + Sync {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> EmbedderResult<Vec<f32>>;

    /// Default implementation calls `embed` sequentially; a provider with
    /// a native batch RPC should override this.
    async fn embed_batch(
        &self,
        texts: &[&str],
        cancel: &CancellationToken,
    ) -> EmbedderResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text, cancel).await?);
        }
        Ok(results)
    }

    /// Fixed vector dimension this client is configured for; every
    /// response is checked against it.
    fn dimension(&self) -> usize;
}
