//! Model collaborators: text embedding and text generation.
//!
//! The index and query code only see these traits, so tests can plug in
//! deterministic stubs and the app can plug in [`crate::OllamaClient`].

// The futures are awaited on the caller's task; no Send bound is required.
#![allow(async_fn_in_trait)]

use crate::store::Vector;

/// Maps text to fixed-dimension vectors. Must be deterministic for a given model.
pub trait Embedder {
    /// Embed several strings; returns one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>, EmbedError>;

    /// Embed a single string.
    async fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        match out.len() {
            1 => Ok(out.remove(0)),
            actual => Err(EmbedError::WrongCount { expected: 1, actual }),
        }
    }
}

/// Produces text from a prompt (explanations, summaries).
pub trait Generator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding backend failed: {0}")]
    Backend(String),
    #[error("embedding backend returned {actual} vector(s) for {expected} input(s)")]
    WrongCount { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
#[error("generation failed: {0}")]
pub struct GenerateError(pub String);
