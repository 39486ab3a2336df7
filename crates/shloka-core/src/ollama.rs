//! Ollama client for embeddings and completion. Wraps ollama-rs with a simple API.

use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;
use thiserror::Error;

use crate::config::Config;
use crate::embed::{EmbedError, Embedder, GenerateError, Generator};
use crate::store::Vector;

pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";
pub const DEFAULT_GENERATE_MODEL: &str = "llama3.2";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Thin wrapper around Ollama for embedding and completion.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    embed_model: String,
    generate_model: String,
}

impl OllamaClient {
    /// Create from URL string. Default: http://localhost:11434.
    pub fn from_url(url: &str) -> Result<Self, OllamaError> {
        let inner = Ollama::try_new(url).map_err(OllamaError::ParseUrl)?;
        Ok(Self {
            inner,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            generate_model: DEFAULT_GENERATE_MODEL.to_string(),
        })
    }

    /// Create from the URL and model names in `config`.
    pub fn from_config(config: &Config) -> Result<Self, OllamaError> {
        Ok(Self::from_url(config.ollama_url())?
            .with_embed_model(config.embed_model())
            .with_generate_model(config.generate_model()))
    }

    /// Set the embedding model (e.g. `all-minilm`, `nomic-embed-text`).
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the completion model used for explanations and summaries.
    pub fn with_generate_model(mut self, model: impl Into<String>) -> Self {
        self.generate_model = model.into();
        self
    }

    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    /// Embed multiple strings in one call. Returns one embedding per input.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OllamaError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(OllamaError::Request)?;
        Ok(res.embeddings)
    }

    /// Single non-streaming completion.
    pub async fn complete(&self, prompt: &str) -> Result<String, OllamaError> {
        let req = GenerationRequest::new(self.generate_model.clone(), prompt.to_string());
        let res = self.inner.generate(req).await.map_err(OllamaError::Request)?;
        Ok(res.response)
    }
}

impl Embedder for OllamaClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>, EmbedError> {
        self.embed_texts(texts)
            .await
            .map_err(|e| EmbedError::Backend(e.to_string()))
    }
}

impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        self.complete(prompt)
            .await
            .map_err(|e| GenerateError(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("invalid Ollama URL: {0}")]
    ParseUrl(#[from] url::ParseError),
    #[error("Ollama request failed: {0}")]
    Request(#[from] ollama_rs::error::OllamaError),
}
