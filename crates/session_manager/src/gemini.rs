//! Google Gemini implementation of [`ChatModel`].
//!
//! Uses the non-streaming `generateContent` endpoint:
//!
//! ```json
//! {
//!   "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }],
//!   "generationConfig": { "temperature": 0.7, "seed": 42 }
//! }
//! ```

use async_trait::async_trait;
use chat_tree::{HistoryMessage, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::{ChatModel, GenerationParams, LlmError, ModelReply, Result, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    /// "user" or "model"
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationConfig {
    temperature: f32,
    seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

/// Gemini REST client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (e.g., for proxies or alternative endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }
}

fn to_contents(messages: &[HistoryMessage]) -> Vec<GeminiContent> {
    messages
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Model => "model",
                Role::System => return None,
            };
            Some(GeminiContent {
                role: role.to_string(),
                parts: vec![GeminiPart {
                    text: Some(m.content.clone()),
                }],
            })
        })
        .collect()
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(
        &self,
        messages: &[HistoryMessage],
        params: &GenerationParams,
    ) -> Result<ModelReply> {
        let request = GenerateRequest {
            contents: to_contents(messages),
            generation_config: GenerationConfig {
                temperature: params.temperature,
                seed: params.seed,
            },
        };

        tracing::debug!(
            model = %params.model,
            messages = request.contents.len(),
            temperature = params.temperature,
            seed = params.seed,
            "Gemini: generateContent"
        );

        let response = self
            .client
            .post(self.endpoint(&params.model))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;

            if status == 401 || status == 403 {
                return Err(LlmError::Auth(format!(
                    "Gemini authentication failed: {}. Please check your API key.",
                    text
                )));
            }

            return Err(LlmError::Api(format!(
                "Gemini API error: HTTP {}: {}",
                status, text
            )));
        }

        let body: GenerateResponse = serde_json::from_str(&response.text().await?)?;
        let content = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or(LlmError::EmptyResponse)?;

        let text = content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<String>();
        let usage = body.usage_metadata.unwrap_or_default();

        Ok(ModelReply {
            text,
            usage: TokenUsage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            },
        })
    }
}
