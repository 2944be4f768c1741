//! Completion Client trait (§4.D).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::CompletionError;
use crate::pipeline::json_repair::repair_and_parse;

pub type CompletionResult<T> = std::result::Result<T, CompletionError>;

/// Wraps the completion provider's chat RPC. Implementations own
/// retry/backoff identical to the Embedder Client, and a per-call
/// timeout (~120s, §4.D).
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Raw text completion. `schema_hint` is advisory (e.g. embedded in
    /// the system prompt, or used by providers with native JSON-schema
    /// response formats); callers that need a typed result should use
    /// [`CompletionClient::complete_json`] instead.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        schema_hint: Option<&serde_json::Value>,
        cancel: &CancellationToken,
    ) -> CompletionResult<String>;

    /// Request a completion and parse it as `T`. MUST return a valid
    /// instance of `T` — if the raw response is noisy, the longest
    /// balanced JSON object/array in the body is located and parsed
    /// instead; if that still fails, `T`'s `Default` is returned rather
    /// than an error (§4.D: "this recovery is load-bearing").
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
        Ok(repair_and_parse(&raw))
    }
}
