//! Async HTTP client for OpenAI-compatible chat completion endpoints.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::provider::{Completion, CompletionFuture, CompletionProvider, CompletionRequest};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model for answers.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Client-side timeout for one completion request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unset optional fields are omitted.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// Role of a message in the request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ApiMessage {
    pub role: Role,
    pub content: String,
}

impl ApiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenAiClient::chat()`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl OpenAiClient {
    /// Create a client for the public OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_url(api_key, OPENAI_URL)
    }

    /// Create a client for any OpenAI-compatible endpoint URL.
    pub fn with_url(api_key: impl Into<String>, url: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            url: url.into(),
        })
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_completion_tokens={}",
            body.model,
            body.messages.len(),
            body.max_completion_tokens,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("completion API HTTP {status}: {text}"));
        }

        parse_response(&text)
    }
}

/// Decode a successful HTTP body into a [`ChatCompletion`].
fn parse_response(text: &str) -> Result<ChatCompletion, String> {
    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(format!("completion API error: {}", err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => Ok(ChatCompletion {
            content: c.message.content,
            usage: parsed.usage,
            finish_reason: c.finish_reason,
        }),
        None => Ok(ChatCompletion {
            content: None,
            usage: parsed.usage,
            finish_reason: None,
        }),
    }
}

/// Build the wire request for a single-turn completion.
fn build_request(request: &CompletionRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(ref system) = request.system {
        messages.push(ApiMessage::system(system));
    }
    messages.push(ApiMessage::user(&request.prompt));
    ChatRequest {
        model: request.model.clone(),
        messages,
        max_completion_tokens: request.max_completion_tokens,
        n: Some(1),
    }
}

/// Reduce a raw completion to text plus token counts.
fn into_completion(completion: ChatCompletion) -> Result<Completion, String> {
    let text = completion
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| "Empty LLM response".to_string())?;
    let usage = completion.usage.unwrap_or_default();
    Ok(Completion {
        text,
        prompt_tokens: usage.prompt_tokens.unwrap_or(0),
        completion_tokens: usage.completion_tokens.unwrap_or(0),
    })
}

impl CompletionProvider for OpenAiClient {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(async move {
            let body = build_request(request);
            into_completion(self.chat(&body).await?)
        })
    }
}
