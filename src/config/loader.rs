//! Configuration loader with environment variable support

use super::{Config, LlmProvider};
use crate::error::{RagError, Result};
use config::{Environment, File};
use secrecy::Secret;
use std::path::Path;
use tracing::debug;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Load configuration from a TOML file with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .add_source(
            Environment::with_prefix("RAG")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Build configuration from defaults and the workshop environment variables
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default_config();

    if let Some(port) = env_var("PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| RagError::Config(format!("PORT is not a valid port: {}", port)))?;
    }

    apply_llm_env(&mut config)?;

    if let Some(url) = env_var("EMBEDDING_API_URL") {
        config.embedding.api_url = url;
    }
    if let Some(key) = env_var("EMBEDDING_API_KEY") {
        config.embedding.api_key = Some(Secret::new(key));
    }
    if let Some(model) = env_var("EMBEDDING_MODEL") {
        config.embedding.model = model;
    }
    if let Some(dimension) = env_var("EMBEDDING_DIMENSION") {
        config.embedding.dimension = dimension.parse().map_err(|_| {
            RagError::Config(format!("EMBEDDING_DIMENSION is not a number: {}", dimension))
        })?;
    }

    if let Some(url) = env_var("QDRANT_URL") {
        config.vector_db.url = url;
    }
    if let Some(key) = env_var("QDRANT_API_KEY") {
        config.vector_db.api_key = Some(Secret::new(key));
    }
    if let Some(collection) = env_var("AZURE_SEARCH_INDEX") {
        config.vector_db.collection = collection;
    }

    if let Some(level) = env_var("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env_var("LOG_FORMAT") {
        config.logging.format = format;
    }

    debug!(provider = config.llm.provider.as_str(), "Configuration built from environment");
    Ok(config)
}

/// Select the LLM backend. An explicit `LLM_PROVIDER` wins, otherwise an
/// Azure endpoint selects Azure OpenAI, then an OpenAI key selects OpenAI.
fn apply_llm_env(config: &mut Config) -> Result<()> {
    let azure_endpoint = env_var("AZURE_OPENAI_URL").or_else(|| env_var("AZURE_OPENAI_ENDPOINT"));

    let provider = match env_var("LLM_PROVIDER") {
        Some(raw) => raw.parse::<LlmProvider>().map_err(RagError::Config)?,
        None if azure_endpoint.is_some() => LlmProvider::AzureOpenAi,
        None if env_var("OPENAI_API_KEY").is_some() => LlmProvider::OpenAi,
        None => LlmProvider::Ollama,
    };

    let llm = &mut config.llm;
    llm.provider = provider;

    match provider {
        LlmProvider::AzureOpenAi => {
            llm.endpoint = azure_endpoint.unwrap_or_default();
            llm.api_key = env_var("AZURE_OPENAI_KEY").map(Secret::new);
            llm.model = env_var("AZURE_OPENAI_DEPLOYMENT_NAME").unwrap_or_else(|| "gpt-35-turbo".to_string());
            if let Some(version) = env_var("AZURE_OPENAI_API_VERSION") {
                llm.api_version = version;
            }
        }
        LlmProvider::OpenAi => {
            llm.endpoint = env_var("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            llm.api_key = env_var("OPENAI_API_KEY").map(Secret::new);
            llm.model = env_var("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        }
        LlmProvider::Ollama => {
            if let Some(url) = env_var("OLLAMA_BASE_URL") {
                llm.endpoint = url;
            }
            if let Some(model) = env_var("OLLAMA_MODEL_NAME") {
                llm.model = model;
            }
        }
    }

    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
