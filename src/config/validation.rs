//! Configuration validation

use super::*;
use crate::error::{RagError, Result};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_llm_config(&config.llm)?;
    validate_embedding_config(&config.embedding)?;
    validate_vector_db_config(&config.vector_db)?;
    validate_ingestion_config(&config.ingestion)?;
    validate_chat_config(&config.chat)?;
    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validate server configuration
fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(RagError::Config("Server port cannot be 0".to_string()));
    }

    if config.max_body_size_mb == 0 {
        return Err(RagError::Config(
            "Maximum body size must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate chat completion backend configuration
fn validate_llm_config(config: &LlmConfig) -> Result<()> {
    if config.endpoint.is_empty() {
        return Err(RagError::Config(format!(
            "LLM endpoint is required for provider {}",
            config.provider.as_str()
        )));
    }

    if !is_http_url(&config.endpoint) {
        return Err(RagError::Config(
            "LLM endpoint must start with http:// or https://".to_string()
        ));
    }

    if config.model.trim().is_empty() {
        return Err(RagError::Config(
            "LLM model (or Azure deployment name) cannot be empty".to_string()
        ));
    }

    if config.provider == LlmProvider::OpenAi && config.api_key.is_none() {
        return Err(RagError::Config(
            "OpenAI provider requires an API key".to_string()
        ));
    }

    if config.provider == LlmProvider::AzureOpenAi && config.api_version.trim().is_empty() {
        return Err(RagError::Config(
            "Azure OpenAI API version cannot be empty".to_string()
        ));
    }

    if config.timeout_secs == 0 || config.timeout_secs > 300 {
        return Err(RagError::Config(
            "LLM timeout must be between 1 and 300 seconds".to_string()
        ));
    }

    if config.max_tokens == Some(0) {
        return Err(RagError::Config(
            "LLM max_tokens must be greater than 0 when set".to_string()
        ));
    }

    Ok(())
}

/// Validate embedding configuration
fn validate_embedding_config(config: &EmbeddingConfig) -> Result<()> {
    if config.api_url.is_empty() {
        return Err(RagError::Config(
            "Embedding API URL cannot be empty".to_string()
        ));
    }

    if !is_http_url(&config.api_url) {
        return Err(RagError::Config(
            "Embedding API URL must start with http:// or https://".to_string()
        ));
    }

    if config.dimension == 0 {
        return Err(RagError::Config(
            "Embedding dimension must be greater than 0".to_string()
        ));
    }

    if config.batch_size == 0 {
        return Err(RagError::Config(
            "Embedding batch size must be greater than 0".to_string()
        ));
    }

    if config.batch_size > 1000 {
        return Err(RagError::Config(
            "Embedding batch size too large (max: 1000)".to_string()
        ));
    }

    if config.timeout_secs == 0 || config.timeout_secs > 300 {
        return Err(RagError::Config(
            "Embedding timeout must be between 1 and 300 seconds".to_string()
        ));
    }

    if config.max_retries > 10 {
        return Err(RagError::Config(
            "Max retries too large (max: 10)".to_string()
        ));
    }

    if config.cache_enabled {
        if config.cache_size == 0 {
            return Err(RagError::Config(
                "Cache size must be greater than 0 when cache is enabled".to_string()
            ));
        }

        if config.cache_ttl_secs == 0 {
            return Err(RagError::Config(
                "Cache TTL must be greater than 0 when cache is enabled".to_string()
            ));
        }
    }

    Ok(())
}

/// Validate vector database configuration
fn validate_vector_db_config(config: &VectorDbConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(RagError::Config(
            "Vector database URL cannot be empty".to_string()
        ));
    }

    if !is_http_url(&config.url) {
        return Err(RagError::Config(
            "Vector database URL must start with http:// or https://".to_string()
        ));
    }

    if config.collection.trim().is_empty() {
        return Err(RagError::Config(
            "Collection name cannot be empty".to_string()
        ));
    }

    if config.collection.len() > 255 {
        return Err(RagError::Config(
            "Collection name too long (max: 255 characters)".to_string()
        ));
    }

    if config.timeout_secs == 0 {
        return Err(RagError::Config(
            "Vector database timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate splitter settings
fn validate_ingestion_config(config: &IngestionConfig) -> Result<()> {
    if config.max_section_length == 0 {
        return Err(RagError::Config(
            "Maximum section length must be greater than 0".to_string()
        ));
    }

    if config.section_overlap >= config.max_section_length {
        return Err(RagError::Config(format!(
            "Section overlap ({}) must be smaller than the maximum section length ({})",
            config.section_overlap, config.max_section_length
        )));
    }

    Ok(())
}

/// Validate retrieval settings
fn validate_chat_config(config: &ChatConfig) -> Result<()> {
    if config.top_k == 0 || config.top_k > 50 {
        return Err(RagError::Config(
            "Chat top_k must be between 1 and 50".to_string()
        ));
    }

    if let Some(score) = config.min_score {
        if !(-1.0..=1.0).contains(&score) {
            return Err(RagError::Config(format!(
                "Chat min_score must be between -1.0 and 1.0, got {}",
                score
            )));
        }
    }

    if config.system_prompt.trim().is_empty() {
        return Err(RagError::Config(
            "System prompt cannot be empty".to_string()
        ));
    }

    Ok(())
}
