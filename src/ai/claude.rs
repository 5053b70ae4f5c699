//! Claude messages API clients: text generation and screenshot scoring.

use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::prompts::{vision_user_prompt, VISION_SYSTEM_PROMPT};
use super::{
    build_http_client, check_error_response, log_response_success, AiClient, AiClientMetadata,
    AiError,
};
use crate::resolve::ContentChecker;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const SCORE_MAX_TOKENS: u32 = 16;

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static SCORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// Claude API request message.
#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: MessageContent,
}

/// Plain text or a list of typed content blocks.
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

/// Claude API request body.
#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

/// Claude API response content.
#[derive(Deserialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Claude API response.
#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeAiClient {
    /// HTTP client for API requests.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// Model identifier.
    model: String,
    /// Response token limit for text generation.
    max_tokens: u32,
    /// Messages endpoint URL.
    endpoint: String,
}

impl ClaudeAiClient {
    /// Creates a new Claude client against `base_url`.
    pub fn new(model: &str, api_key: String, max_tokens: u32, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
            model: model.to_string(),
            max_tokens,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
        })
    }

    /// Model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, request: &ClaudeRequest) -> Result<String> {
        info!(
            url = %self.endpoint,
            model = %self.model,
            max_tokens = request.max_tokens,
            "Sending request to Claude API"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AiError::NetworkError(e.to_string()))?;

        let response = check_error_response(response).await?;

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponseFormat(e.to_string()))?;

        debug!(
            content_count = claude_response.content.len(),
            "Received Claude API response"
        );

        let result = claude_response
            .content
            .into_iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text)
            .ok_or_else(|| {
                AiError::InvalidResponseFormat("No text content in response".to_string()).into()
            });

        log_response_success("Claude", &result);
        result
    }
}

impl AiClient for ClaudeAiClient {
    fn send_request<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                system_prompt_len = system_prompt.len(),
                user_prompt_len = user_prompt.len(),
                model = %self.model,
                "Preparing Claude API request"
            );

            let request = ClaudeRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                system: system_prompt.to_string(),
                messages: vec![Message {
                    role: "user",
                    content: MessageContent::Text(user_prompt.to_string()),
                }],
            };

            self.post(&request).await
        })
    }

    fn get_metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: "Anthropic".to_string(),
            model: self.model.clone(),
            max_response_length: self.max_tokens as usize,
        }
    }
}

/// Screenshot content checker backed by Claude vision.
pub struct ClaudeVisionChecker {
    client: ClaudeAiClient,
}

impl ClaudeVisionChecker {
    /// Wraps a Claude client.
    pub fn new(client: ClaudeAiClient) -> Self {
        Self { client }
    }
}

impl ContentChecker for ClaudeVisionChecker {
    fn alignment_score<'a>(
        &'a self,
        image: &'a [u8],
        media_type: &'a str,
        commit_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<f32>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                image_len = image.len(),
                media_type,
                "Preparing Claude vision request"
            );

            let request = ClaudeRequest {
                model: self.client.model.clone(),
                max_tokens: SCORE_MAX_TOKENS,
                system: VISION_SYSTEM_PROMPT.to_string(),
                messages: vec![Message {
                    role: "user",
                    content: MessageContent::Blocks(vec![
                        ContentBlock::Image {
                            source: ImageSource {
                                source_type: "base64",
                                media_type: media_type.to_string(),
                                data: STANDARD.encode(image),
                            },
                        },
                        ContentBlock::Text {
                            text: vision_user_prompt(commit_text),
                        },
                    ]),
                }],
            };

            let text = self.client.post(&request).await?;
            parse_score(&text)
        })
    }
}

/// Extracts a 0..=1 score from a model reply; percentages are accepted.
pub fn parse_score(text: &str) -> Result<f32> {
    let value: f32 = SCORE_PATTERN
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| AiError::InvalidResponseFormat(format!("No score in reply: {text:?}")))?;

    let score = if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    };
    if !(0.0..=1.0).contains(&score) {
        return Err(AiError::InvalidResponseFormat(format!("Score out of range: {value}")).into());
    }
    Ok(score)
}
