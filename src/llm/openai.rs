//! Azure OpenAI and OpenAI chat completions
//!
//! - Azure: `POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=..`
//!   authenticated with an `api-key` header
//! - OpenAI: `POST {base_url}/chat/completions` with a bearer token
//!
//! Streaming requests set `stream: true` and read the server-sent events.

use super::stream::{response_lines, DeltaStream};
use super::{base_url, status_error, ChatModel, PromptMessage, SamplingOptions};
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use futures::{future, StreamExt, TryStreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

/// Client for the OpenAI chat completions API, in its Azure or public flavor
#[derive(Debug)]
pub struct OpenAiChatModel {
    client: reqwest::Client,
    url: String,
    model: String,
    /// Azure selects the model by deployment in the URL
    send_model: bool,
    max_tokens: Option<u32>,
}

impl OpenAiChatModel {
    /// Azure OpenAI deployment; `config.model` is the deployment name
    pub fn azure(config: &LlmConfig) -> Result<Self> {
        let key = config.api_key.as_ref().ok_or(LlmError::MissingApiKey("Azure OpenAI"))?;
        let base = base_url(&config.endpoint)?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            base, config.model, config.api_version
        );

        let mut headers = HeaderMap::new();
        headers.insert("api-key", sensitive(key.expose_secret())?);

        Self::build(config, url, headers, false)
    }

    /// Public OpenAI API or any compatible server
    pub fn openai(config: &LlmConfig) -> Result<Self> {
        let key = config.api_key.as_ref().ok_or(LlmError::MissingApiKey("OpenAI"))?;
        let url = format!("{}/chat/completions", base_url(&config.endpoint)?);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, sensitive(&format!("Bearer {}", key.expose_secret()))?);

        Self::build(config, url, headers, true)
    }

    fn build(config: &LlmConfig, url: String, headers: HeaderMap, send_model: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(LlmError::Transport)?;

        info!(
            provider = config.provider.as_str(),
            model = %config.model,
            timeout_secs = config.timeout_secs,
            "OpenAI chat model initialized"
        );

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            send_model,
            max_tokens: config.max_tokens,
        })
    }
}

fn sensitive(value: &str) -> std::result::Result<HeaderValue, LlmError> {
    let mut header = HeaderValue::from_str(value).map_err(|e| LlmError::InvalidApiKey(e.to_string()))?;
    header.set_sensitive(true);
    Ok(header)
}

impl OpenAiChatModel {
    async fn send(
        &self,
        messages: &[PromptMessage],
        options: &SamplingOptions,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: self.send_model.then_some(self.model.as_str()),
            messages,
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens.or(self.max_tokens),
            stream,
        };

        debug!(messages = messages.len(), stream, "POST {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Transport)?;

        if !response.status().is_success() {
            let err = status_error(response, &self.url).await;
            error!(error = %err, latency_ms = started.elapsed().as_millis(), "Chat completion failed");
            return Err(err.into());
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<String> {
        let started = Instant::now();
        let response = self.send(messages, options, false).await?;

        let out: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::Decode(format!("serde error: {e}; expected `choices[0].message.content`"))
        })?;

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(LlmError::EmptyChoices)?;

        info!(latency_ms = started.elapsed().as_millis(), "Chat completion completed");
        Ok(content)
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete_stream(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<DeltaStream> {
        let response = self.send(messages, options, true).await?;
        info!("Chat completion stream opened");

        let deltas = response_lines(response)
            .try_take_while(|line| future::ready(Ok(!is_done(line))))
            .try_filter_map(|line| future::ready(event_delta(&line)))
            .boxed();
        Ok(deltas)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn is_done(line: &str) -> bool {
    line.strip_prefix("data:").map(str::trim) == Some("[DONE]")
}

/// Text delta of one server-sent event line; comments, blank lines and
/// chunks without content yield nothing
fn event_delta(line: &str) -> Result<Option<String>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };

    let chunk: ChatCompletionChunk = serde_json::from_str(data.trim())
        .map_err(|e| LlmError::Decode(format!("serde error: {e}; expected `choices[0].delta`")))?;

    Ok(chunk
        .choices
        .into_iter()
        .find_map(|c| c.delta.content)
        .filter(|content| !content.is_empty()))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [PromptMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}
