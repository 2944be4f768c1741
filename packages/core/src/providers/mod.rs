//! Concrete provider implementations of the Embedder and Completion
//! client traits.

#[cfg(feature = "openai")]
pub mod openai;
pub mod retry;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;
