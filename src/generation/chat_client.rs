//! # Chat Completion Client
//!
//! HTTP client for OpenAI-compatible `/chat/completions` endpoints. Each
//! prompt is sent as a single user message. With `stream = true` the
//! server-sent-event body is read to completion and the content deltas are
//! concatenated, so callers always get the full text.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{GenerationFailure, GenerationOutcome, GenerationService};
use crate::config::GenerationConfig;
use crate::error::{DatasetError, DatasetResult};

/// Longest error body kept in a failure reason
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChatChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChunkChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    content: Option<String>,
}

/// [`GenerationService`] backed by a chat-completion HTTP API
pub struct ChatCompletionClient {
    client: Client,
    endpoint: Url,
    config: GenerationConfig,
}

impl std::fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.config.model)
            .field("timeout_ms", &self.config.timeout_ms)
            .field("stream", &self.config.stream)
            .field("api_key_set", &self.config.api_key.is_some())
            .finish()
    }
}

impl ChatCompletionClient {
    pub fn new(config: GenerationConfig) -> DatasetResult<Self> {
        let endpoint = completions_endpoint(&config.base_url)?;

        let mut client_builder = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("scad-dataset/{}", env!("CARGO_PKG_VERSION")));

        if let Some(ref api_key) = config.api_key {
            let mut default_headers = reqwest::header::HeaderMap::new();
            let mut value: reqwest::header::HeaderValue = format!("Bearer {api_key}")
                .parse()
                .map_err(|e| DatasetError::configuration(format!("Invalid API key: {e}")))?;
            value.set_sensitive(true);
            default_headers.insert(reqwest::header::AUTHORIZATION, value);
            client_builder = client_builder.default_headers(default_headers);
        } else {
            warn!("No API key configured for the generation service");
        }

        let client = client_builder.build().map_err(|e| {
            DatasetError::configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        info!(
            endpoint = %endpoint,
            model = %config.model,
            timeout_ms = config.timeout_ms,
            stream = config.stream,
            "Created ChatCompletionClient"
        );

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    async fn request(&self, prompt: &str) -> Result<String, GenerationFailure> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: self.config.stream,
            temperature: self.config.temperature,
        };

        debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "Sending chat completion request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(GenerationFailure::HttpStatus {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        if self.config.stream {
            parse_event_stream(&text)
        } else {
            parse_completion(&text)
        }
    }
}

#[async_trait]
impl GenerationService for ChatCompletionClient {
    async fn generate(&self, prompt: &str) -> GenerationOutcome {
        match self.request(prompt).await {
            Ok(text) => GenerationOutcome::from_text(text),
            Err(failure) => GenerationOutcome::Failed(failure),
        }
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

/// `<base_url>/chat/completions`, tolerating a trailing slash on the base
fn completions_endpoint(base_url: &str) -> DatasetResult<Url> {
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalized)
        .and_then(|base| base.join("chat/completions"))
        .map_err(|e| {
            DatasetError::configuration(format!("Invalid base URL '{base_url}': {e}"))
        })
}

fn classify_transport_error(error: reqwest::Error) -> GenerationFailure {
    if error.is_timeout() {
        GenerationFailure::Timeout
    } else {
        GenerationFailure::Transport(error.to_string())
    }
}

/// Extract the first choice's message content from a non-streamed body
pub(crate) fn parse_completion(body: &str) -> Result<String, GenerationFailure> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationFailure::MalformedResponse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(GenerationFailure::EmptyResponse)
}

/// Concatenate `delta.content` fragments from a server-sent-event body
pub(crate) fn parse_event_stream(body: &str) -> Result<String, GenerationFailure> {
    let mut content = String::new();
    let mut saw_event = false;

    for line in body.lines() {
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            break;
        }
        if data.is_empty() {
            continue;
        }

        let chunk: ChatChunk = serde_json::from_str(data)
            .map_err(|e| GenerationFailure::MalformedResponse(format!("bad stream chunk: {e}")))?;
        saw_event = true;
        for choice in chunk.choices {
            if let Some(fragment) = choice.delta.content {
                content.push_str(&fragment);
            }
        }
    }

    if !saw_event {
        return Err(GenerationFailure::MalformedResponse(
            "stream contained no data events".to_string(),
        ));
    }
    Ok(content)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
