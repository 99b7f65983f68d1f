//! OpenAI-compatible chat-completions provider with SSE streaming.
//!
//! Sends one system + user message pair with `stream: true`, assembles the
//! `choices[0].delta.content` fragments and hands the complete text to the
//! correction loop. Rate limits (429) and server errors (5xx) are retried with
//! exponential backoff; a `Retry-After` header wins over the computed delay.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use gatekeeper::{CompletionProvider, CompletionRequest, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderSettings;

pub const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const BACKOFF_MULTIPLIER: u64 = 2;
/// Retry-After values outside (0, this) are ignored.
const MAX_RETRY_AFTER_SECS: u64 = 300;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_completion_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Streaming chat-completions client.
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsProvider {
    pub fn new(settings: &ProviderSettings, api_key: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: chat_completions_url(&settings.base_url),
            model: settings.model.clone(),
            api_key: api_key.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, ProviderError> {
        let mut retry_count = 0;

        loop {
            let sent = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) => {
                    if is_retryable_network_error(&err) && retry_count < MAX_RETRIES {
                        retry_count += 1;
                        let delay = backoff_secs(retry_count);
                        warn!(retry_count, delay, error = %err, "Network error, retrying");
                        tokio::time::sleep(Duration::from_secs(delay)).await;
                        continue;
                    }
                    return Err(ProviderError::Transport(err.to_string()));
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retry_after_hint = parse_retry_after_header(response.headers());
            let text = response.text().await.unwrap_or_default();
            let retryable = status.as_u16() == 429 || status.is_server_error();
            if retryable && retry_count < MAX_RETRIES {
                retry_count += 1;
                let delay = if status.as_u16() == 429 {
                    retry_after_hint.unwrap_or_else(|| backoff_secs(retry_count))
                } else {
                    backoff_secs(retry_count)
                };
                warn!(
                    status = status.as_u16(),
                    retry_count,
                    delay,
                    "Provider returned a retryable status"
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
                continue;
            }

            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            max_completion_tokens: request.sampling.max_completion_tokens,
            stream: true,
        };

        debug!(model = %self.model, prompt_chars = request.prompt.len(), "Sending chat completion");
        let response = self.send(&body).await?;

        let mut stream = response.bytes_stream();
        let mut assembler = SseAssembler::default();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| ProviderError::Transport(e.to_string()))?;
            if assembler.push(&bytes)? {
                break;
            }
        }
        assembler.finish()
    }
}

/// Incremental SSE parser for chat-completion chunks.
///
/// Feed it raw bytes as they arrive; only complete lines are decoded, so a
/// multi-byte character split across reads stays intact. `data:` lines are
/// grouped into events at blank lines and each event's delta content is
/// appended in order.
#[derive(Debug, Default)]
pub struct SseAssembler {
    buffer: Vec<u8>,
    event_data: String,
    content: String,
    done: bool,
}

impl SseAssembler {
    /// Consume more stream bytes. Returns `true` once `[DONE]` was seen.
    pub fn push(&mut self, bytes: &[u8]) -> Result<bool, ProviderError> {
        if self.done {
            return Ok(true);
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = decode_line(&raw[..pos])?;
            let line = line.trim_end();

            if line.is_empty() {
                if self.flush_event()? {
                    return Ok(true);
                }
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                self.append_data(data);
            }
        }
        Ok(false)
    }

    /// Process any trailing event and return the trimmed text.
    ///
    /// A stream that ends cleanly without content yields an empty string; the
    /// validator rejects it like any other bad artifact.
    pub fn finish(mut self) -> Result<String, ProviderError> {
        if !self.done {
            let rest = std::mem::take(&mut self.buffer);
            let rest = decode_line(&rest)?;
            if let Some(data) = rest.trim().strip_prefix("data:") {
                self.append_data(data);
            }
            self.flush_event()?;
        }
        Ok(self.content.trim().to_string())
    }

    fn append_data(&mut self, data: &str) {
        if !self.event_data.is_empty() {
            self.event_data.push('\n');
        }
        self.event_data.push_str(data.trim_start());
    }

    fn flush_event(&mut self) -> Result<bool, ProviderError> {
        if self.event_data.is_empty() {
            return Ok(false);
        }
        let payload = std::mem::take(&mut self.event_data);
        self.done = process_sse_payload(&payload, &mut self.content)?;
        Ok(self.done)
    }
}

/// Append one event's delta content. Returns `true` on the `[DONE]` sentinel.
fn process_sse_payload(payload: &str, content: &mut String) -> Result<bool, ProviderError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(false);
    }
    if payload == "[DONE]" {
        return Ok(true);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| ProviderError::MalformedStream(format!("bad chunk: {e}")))?;
    if let Some(text) = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        content.push_str(&text);
    }
    Ok(false)
}

fn decode_line(bytes: &[u8]) -> Result<&str, ProviderError> {
    std::str::from_utf8(bytes)
        .map_err(|e| ProviderError::MalformedStream(format!("invalid UTF-8 in stream: {e}")))
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn backoff_secs(retry_count: u32) -> u64 {
    let factor = BACKOFF_MULTIPLIER.pow(retry_count.saturating_sub(1));
    let secs = INITIAL_BACKOFF_MS.saturating_mul(factor) / 1000;
    secs.max(1)
}

fn is_retryable_network_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn parse_retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0 && *secs < MAX_RETRY_AFTER_SECS)
}
