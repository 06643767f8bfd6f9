//! Chat completion backends (Azure OpenAI, OpenAI, Ollama)

pub mod models;
pub mod ollama;
pub mod openai;
pub mod stream;

pub use models::{PromptMessage, Role, SamplingOptions};
pub use ollama::OllamaChatModel;
pub use openai::OpenAiChatModel;
pub use stream::DeltaStream;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use futures::{future, stream as futures_stream, StreamExt};
use std::sync::Arc;
use tracing::info;

/// Maximum number of characters of an error body kept in [`LlmError::HttpStatus`]
const SNIPPET_CHARS: usize = 240;

/// A model that answers a prompt with a single completion
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a non-streaming completion and return the answer text
    async fn complete(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<String>;

    /// Stream the answer as it is generated. Backends without streaming
    /// support yield the whole completion as a single delta.
    async fn complete_stream(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<DeltaStream> {
        let answer = self.complete(messages, options).await?;
        Ok(futures_stream::once(future::ready(Ok(answer))).boxed())
    }

    /// Model or deployment name, for logs and health reports
    fn name(&self) -> &str;
}

/// Build the backend selected by `config.provider`
pub fn build_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    let model: Arc<dyn ChatModel> = match config.provider {
        LlmProvider::AzureOpenAi => Arc::new(OpenAiChatModel::azure(config)?),
        LlmProvider::OpenAi => Arc::new(OpenAiChatModel::openai(config)?),
        LlmProvider::Ollama => Arc::new(OllamaChatModel::new(config)?),
    };

    info!(provider = config.provider.as_str(), model = model.name(), "Chat model ready");
    Ok(model)
}

/// Endpoint without trailing slashes; must be http or https
fn base_url(endpoint: &str) -> std::result::Result<String, LlmError> {
    let endpoint = endpoint.trim();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(LlmError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_CHARS).collect()
}

/// Turn a non-2xx response into [`LlmError::HttpStatus`]
async fn status_error(response: reqwest::Response, url: &str) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    LlmError::HttpStatus {
        status,
        url: url.to_string(),
        snippet: snippet(&body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url(" http://localhost:11434/ ").unwrap(), "http://localhost:11434");
        assert!(matches!(base_url("localhost:11434"), Err(LlmError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_snippet_is_bounded() {
        assert_eq!(snippet(&"é".repeat(500)).chars().count(), SNIPPET_CHARS);
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn test_build_chat_model_selects_backend() {
        let ollama = build_chat_model(&LlmConfig::default()).unwrap();
        assert_eq!(ollama.name(), "llama3");

        let azure = LlmConfig {
            provider: LlmProvider::AzureOpenAi,
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: Some(Secret::new("key".to_string())),
            model: "gpt-35-turbo".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(build_chat_model(&azure).unwrap().name(), "gpt-35-turbo");

        let openai_without_key = LlmConfig {
            provider: LlmProvider::OpenAi,
            endpoint: "https://api.openai.com/v1".to_string(),
            ..LlmConfig::default()
        };
        assert!(build_chat_model(&openai_without_key).is_err());
    }
}
