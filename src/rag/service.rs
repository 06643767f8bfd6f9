//! Retrieval augmented chat: embed the question, fetch sources, ask the model

use super::models::{ChatMessage, ChatRequest, ChatResponse, ChatResponseChunk, ResponseContext};
use super::tokens::TokenEstimator;
use crate::config::{ChatConfig, FOLLOW_UP_PLACEHOLDER, FOLLOW_UP_QUESTIONS_PROMPT};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, ValidationError};
use crate::llm::{ChatModel, PromptMessage, Role, SamplingOptions};
use crate::middleware::InputValidator;
use crate::vector_db::{SearchParams, VectorStore};
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Streamed answer, one chunk per model delta
pub type ChunkStream = BoxStream<'static, Result<ChatResponseChunk>>;

/// Answers chat requests grounded in the stored document segments
pub struct ChatService {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    model: Arc<dyn ChatModel>,
    collection: String,
    config: ChatConfig,
    tokens: TokenEstimator,
}

/// Prompt and retrieval results of one request, ready for the model
struct PreparedChat {
    prompt: Vec<PromptMessage>,
    options: SamplingOptions,
    context: Option<ResponseContext>,
    sources: usize,
}

impl ChatService {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        model: Arc<dyn ChatModel>,
        collection: impl Into<String>,
        config: ChatConfig,
    ) -> Self {
        Self {
            embeddings,
            store,
            model,
            collection: collection.into(),
            config,
            tokens: TokenEstimator::default(),
        }
    }

    /// Name of the configured chat model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    #[instrument(skip_all, fields(user = request.user.as_deref().unwrap_or("-")))]
    pub async fn run(&self, request: ChatRequest) -> Result<ChatResponse> {
        let started = Instant::now();
        let prepared = self.prepare(&request).await?;
        let answer = self.model.complete(&prepared.prompt, &prepared.options).await?;

        info!(
            sources = prepared.sources,
            prompt_messages = prepared.prompt.len(),
            latency_ms = started.elapsed().as_millis(),
            "Answered chat request"
        );

        Ok(ChatResponse::from_message(answer, prepared.context))
    }

    /// Like [`ChatService::run`], but the answer is streamed as the model
    /// produces it. Retrieval and prompt errors are returned before the
    /// stream starts.
    #[instrument(skip_all, fields(user = request.user.as_deref().unwrap_or("-")))]
    pub async fn run_stream(&self, request: ChatRequest) -> Result<ChunkStream> {
        let prepared = self.prepare(&request).await?;
        let deltas = self.model.complete_stream(&prepared.prompt, &prepared.options).await?;

        info!(
            sources = prepared.sources,
            prompt_messages = prepared.prompt.len(),
            "Streaming chat answer"
        );

        let mut context = prepared.context;
        Ok(deltas
            .map(move |delta| delta.map(|content| ChatResponseChunk::from_delta(content, context.take())))
            .boxed())
    }

    async fn prepare(&self, request: &ChatRequest) -> Result<PreparedChat> {
        InputValidator::validate_sampling(request.temperature, request.top_p)?;

        let question = request
            .last_user_message()
            .map(InputValidator::sanitize_text)
            .filter(|q| !q.is_empty())
            .ok_or(ValidationError::MissingUserMessage)?;

        let query_vector = self.embeddings.embed_single(&question).await?;

        let params = SearchParams::new(query_vector.into_inner(), self.config.top_k)
            .with_score_threshold(self.config.min_score);
        let results = self.store.search(&self.collection, params).await?;
        debug!(sources = results.len(), "Retrieved sources");

        let data_points: Vec<String> = results.iter().map(|r| r.segment.source_line()).collect();
        let prompt = self.build_prompt(&question, &data_points, request.history());

        let options = SamplingOptions {
            temperature: Some(request.temperature),
            top_p: Some(request.top_p),
            max_tokens: None,
        };

        let sources = data_points.len();
        let context = self.config.include_context.then(|| ResponseContext {
            thoughts: thoughts(&question, &prompt),
            data_points,
        });

        Ok(PreparedChat {
            prompt,
            options,
            context,
            sources,
        })
    }

    /// System message, earlier turns in order, then the question with its
    /// sources. Earlier turns are added newest first while the estimated
    /// prompt size is within `history_token_limit`.
    fn build_prompt(&self, question: &str, data_points: &[String], history: &[ChatMessage]) -> Vec<PromptMessage> {
        let system = self.system_message();
        let user = format!("{}\n\nSources:\n{}", question, data_points.join("\n"));

        let mut tokens = self.tokens.estimate_message(Role::System, &system)
            + self.tokens.estimate_message(Role::User, &user);

        let mut earlier = Vec::new();
        let turns = history
            .iter()
            .rev()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant) && !m.content.trim().is_empty());
        for message in turns {
            if tokens > self.config.history_token_limit {
                break;
            }
            tokens += self.tokens.estimate_message(message.role, &message.content);
            earlier.push(PromptMessage {
                role: message.role,
                content: message.content.clone(),
            });
        }
        debug!(history = earlier.len(), estimated_tokens = tokens, "Built prompt");

        let mut prompt = Vec::with_capacity(earlier.len() + 2);
        prompt.push(PromptMessage::system(system));
        prompt.extend(earlier.into_iter().rev());
        prompt.push(PromptMessage::user(user));
        prompt
    }

    fn system_message(&self) -> String {
        let follow_up = if self.config.follow_up_questions {
            FOLLOW_UP_QUESTIONS_PROMPT
        } else {
            ""
        };
        self.config.system_prompt.replace(FOLLOW_UP_PLACEHOLDER, follow_up)
    }
}

/// Search query and prompt as HTML, shown by the workshop frontend
fn thoughts(question: &str, prompt: &[PromptMessage]) -> String {
    let conversation: Vec<String> = prompt
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect();
    format!("Search query:\n{}\n\nConversation:\n{}", question, conversation.join("\n\n")).replace('\n', "<br>")
}
