//! Local Ollama chat backend (`POST {endpoint}/api/chat`)
//!
//! Plain completions send `stream=false`; streamed ones read one JSON object
//! per line until `done`.

use super::stream::{response_lines, DeltaStream};
use super::{base_url, status_error, ChatModel, PromptMessage, SamplingOptions};
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use futures::{future, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Thin client for the Ollama chat API
#[derive(Debug)]
pub struct OllamaChatModel {
    client: reqwest::Client,
    url_chat: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OllamaChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base = base_url(&config.endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmError::Transport)?;

        Ok(Self {
            client,
            url_chat: format!("{}/api/chat", base),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

impl OllamaChatModel {
    async fn send(&self, messages: &[PromptMessage], options: &SamplingOptions, stream: bool) -> Result<reqwest::Response> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream,
            options: ChatOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                num_predict: options.max_tokens.or(self.max_tokens),
            },
        };

        debug!(stream, "POST {}", self.url_chat);
        let response = self
            .client
            .post(&self.url_chat)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Transport)?;

        if !response.status().is_success() {
            return Err(status_error(response, &self.url_chat).await.into());
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<String> {
        let response = self.send(messages, options, false).await?;

        let out: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}; ensure `stream=false` is used")))?;

        Ok(out.message.content)
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete_stream(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<DeltaStream> {
        let response = self.send(messages, options, true).await?;

        let deltas = response_lines(response)
            .try_filter_map(|line| future::ready(line_delta(&line)))
            .boxed();
        Ok(deltas)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Text delta of one streamed line; blank lines and empty deltas yield nothing
fn line_delta(line: &str) -> Result<Option<String>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(line)
        .map_err(|e| LlmError::Decode(format!("serde error: {e}; expected one JSON object per line")))?;

    if let Some(error) = chunk.error {
        return Err(LlmError::Stream(error).into());
    }

    Ok(chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty()))
}

/* ==========================
HTTP payloads & options
========================== */

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    options: ChatOptions,
}

/// Subset of Ollama `options`
#[derive(Debug, Default, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    message: Option<ResponseMessage>,
    error: Option<String>,
}
