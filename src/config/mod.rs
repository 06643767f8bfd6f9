//! Configuration management for the ingestion and chat services

use serde::{Deserialize, Serialize};
use std::path::Path;
use secrecy::{Secret, ExposeSecret};

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Maximum request body size in MB (uploads included)
    #[serde(default = "default_max_body_size")]
    pub max_body_size_mb: usize,
}

/// Chat completion backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Azure OpenAI deployment
    AzureOpenAi,
    /// OpenAI (or any OpenAI-compatible) API
    OpenAi,
    /// Locally hosted Ollama runtime
    #[default]
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::AzureOpenAi => "azure_openai",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Ollama => "ollama",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "azure_openai" | "azure" => Ok(LlmProvider::AzureOpenAi),
            "openai" => Ok(LlmProvider::OpenAi),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(format!("unknown LLM provider '{}'", other)),
        }
    }
}

/// Configuration for the chat completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which backend to call
    #[serde(default)]
    pub provider: LlmProvider,

    /// Base URL (Azure resource endpoint, OpenAI base URL or Ollama URL)
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (Azure `api-key` header or OpenAI bearer token)
    #[serde(default, serialize_with = "serialize_optional_secret", deserialize_with = "deserialize_optional_secret")]
    pub api_key: Option<Secret<String>>,

    /// Model name, or deployment name for Azure OpenAI
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Azure OpenAI REST API version
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
}

/// Configuration for the embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible embeddings endpoint URL
    #[serde(default = "default_embedding_url")]
    pub api_url: String,

    /// API token (optional for local runtimes)
    #[serde(default, serialize_with = "serialize_optional_secret", deserialize_with = "deserialize_optional_secret")]
    pub api_key: Option<Secret<String>>,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension produced by the model
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retry attempts (0 disables retries)
    #[serde(default)]
    pub max_retries: u32,

    /// Enable caching
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Cache maximum size
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

/// Configuration for Qdrant vector database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Qdrant gRPC URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// API key (optional, secured)
    #[serde(default, serialize_with = "serialize_optional_secret", deserialize_with = "deserialize_optional_secret")]
    pub api_key: Option<Secret<String>>,

    /// Collection holding the document segments
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Distance metric
    #[serde(default)]
    pub distance: Distance,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Distance metrics supported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Distance {
    #[default]
    Cosine,
    Euclidean,
    Dot,
}

/// Document splitting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum section length in characters
    #[serde(default = "default_max_section_length")]
    pub max_section_length: usize,

    /// How far past the limit to look for a sentence end
    #[serde(default = "default_sentence_search_limit")]
    pub sentence_search_limit: usize,

    /// Characters shared between consecutive sections
    #[serde(default = "default_section_overlap")]
    pub section_overlap: usize,

    /// Category stored with every segment
    #[serde(default)]
    pub category: Option<String>,
}

/// Retrieval and prompt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of segments placed in the prompt
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score for a segment to be used
    #[serde(default)]
    pub min_score: Option<f32>,

    /// System message sent ahead of the question
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Return data points and thoughts with the answer
    #[serde(default = "default_include_context")]
    pub include_context: bool,

    /// Ask the model for follow-up questions in `<<...>>` after the answer
    #[serde(default = "default_follow_up_questions")]
    pub follow_up_questions: bool,

    /// Estimated prompt tokens after which earlier turns are no longer added
    #[serde(default = "default_history_token_limit")]
    pub history_token_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, compact or pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Placeholder of [`DEFAULT_SYSTEM_PROMPT`] replaced by
/// [`FOLLOW_UP_QUESTIONS_PROMPT`] or removed
pub const FOLLOW_UP_PLACEHOLDER: &str = "{follow_up_questions_prompt}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "Assistant helps the Consto Real Estate company customers with support questions regarding terms of service, privacy policy, and questions about support requests. Be brief in your answers.
Answer ONLY with the facts listed in the list of sources below. If there isn't enough information below, say you don't know. Do not generate answers that don't use the sources below. If asking a clarifying question to the user would help, ask the question.
For tabular information return it as an html table. Do not return markdown format. If the question is not in English, answer in the language used in the question.
Each source has a name followed by colon and the actual information, always include the source name for each fact you use in the response. Use square brackets to reference the source, for example: [info1.txt]. Don't combine sources, list each source separately, for example: [info1.txt][info2.pdf].
{follow_up_questions_prompt}
";

pub const FOLLOW_UP_QUESTIONS_PROMPT: &str = "Generate 3 very brief follow-up questions that the user would likely ask next.
Enclose the follow-up questions in double angle brackets. Example:
<<Am I allowed to invite friends for a party?>>
<<How can I ask for a refund?>>
<<What If I break something?>>

Do no repeat questions that have already been asked.
Make sure the last question ends with \">>\".";

// Default value functions
fn default_server_host() -> String { "0.0.0.0".to_string() }
fn default_server_port() -> u16 { 3000 }
fn default_max_body_size() -> usize { 50 }
fn default_llm_endpoint() -> String { "http://localhost:11434".to_string() }
fn default_llm_model() -> String { "llama3".to_string() }
fn default_azure_api_version() -> String { "2024-02-01".to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_max_tokens() -> Option<u32> { Some(1024) }
fn default_embedding_url() -> String { "http://localhost:11434/v1/embeddings".to_string() }
fn default_embedding_model() -> String { "all-minilm".to_string() }
fn default_embedding_dimension() -> usize { 384 }
fn default_batch_size() -> usize { 32 }
fn default_timeout() -> u64 { 30 }
fn default_cache_enabled() -> bool { true }
fn default_cache_ttl() -> u64 { 3600 }
fn default_cache_size() -> usize { 1000 }
fn default_qdrant_url() -> String { "http://localhost:6334".to_string() }
fn default_collection() -> String { "rag-workshop-collection".to_string() }
fn default_max_section_length() -> usize { 1000 }
fn default_sentence_search_limit() -> usize { 100 }
fn default_section_overlap() -> usize { 100 }
fn default_top_k() -> usize { 3 }
fn default_system_prompt() -> String { DEFAULT_SYSTEM_PROMPT.to_string() }
fn default_include_context() -> bool { true }
fn default_follow_up_questions() -> bool { true }
fn default_history_token_limit() -> usize { 4000 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_body_size_mb: default_max_body_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            api_version: default_azure_api_version(),
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_embedding_url(),
            api_key: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout(),
            max_retries: 0,
            cache_enabled: default_cache_enabled(),
            cache_ttl_secs: default_cache_ttl(),
            cache_size: default_cache_size(),
        }
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
            distance: Distance::default(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_section_length: default_max_section_length(),
            sentence_search_limit: default_sentence_search_limit(),
            section_overlap: default_section_overlap(),
            category: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
            system_prompt: default_system_prompt(),
            include_context: default_include_context(),
            follow_up_questions: default_follow_up_questions(),
            history_token_limit: default_history_token_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration with `RAG__SECTION__KEY` environment overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config_with_env(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Build configuration from the workshop environment variables
    pub fn from_env() -> crate::error::Result<Self> {
        let config = loader::load_from_env()?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Use `CONFIG_PATH` when set, otherwise the environment
    pub fn load() -> crate::error::Result<Self> {
        match std::env::var("CONFIG_PATH") {
            Ok(path) if !path.trim().is_empty() => Self::from_file_with_env(path),
            _ => Self::from_env(),
        }
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_db: VectorDbConfig::default(),
            ingestion: IngestionConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Custom serializer for Option<Secret<String>>
fn serialize_optional_secret<S>(secret: &Option<Secret<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Custom deserializer for Option<Secret<String>>
fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.is_empty()).map(Secret::new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("azure".parse::<LlmProvider>().unwrap(), LlmProvider::AzureOpenAi);
        assert_eq!("Azure-OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::AzureOpenAi);
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert!("bard".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.vector_db.collection, "rag-workshop-collection");
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let raw = r#"
            [llm]
            provider = "azure_openai"
            endpoint = "https://example.openai.azure.com"
            model = "gpt-35-turbo"
            api_key = "secret"

            [chat]
            top_k = 5
        "#;
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from_str(raw, ::config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.llm.provider, LlmProvider::AzureOpenAi);
        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "secret");
        assert_eq!(config.chat.top_k, 5);
        assert_eq!(config.server.port, 3000);
    }
}
