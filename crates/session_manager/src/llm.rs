//! Model collaborator: the one operation that may suspend
//!
//! A `ChatModel` receives the linearized path (user/model turns only) and the
//! caller's generation parameters, and returns the reply text with token
//! usage. Failures come back verbatim; nothing here retries.

use async_trait::async_trait;
use chat_tree::HistoryMessage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("model returned no candidates")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Parameters passed through to the provider untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Provider-side model identifier, e.g. `gemini-2.5-flash`.
    pub model: String,
    pub temperature: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    pub text: String,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a reply for `messages` (oldest first, no `system` entries).
    async fn generate(
        &self,
        messages: &[HistoryMessage],
        params: &GenerationParams,
    ) -> Result<ModelReply>;
}
