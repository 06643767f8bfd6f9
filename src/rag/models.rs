//! Chat API request and response models

use crate::llm::Role;
use serde::{Deserialize, Serialize};

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    1.0
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p", alias = "topP")]
    pub top_p: f32,

    /// Caller supplied end-user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Answer as newline-delimited [`ChatResponseChunk`]s
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Request with a single user question and default sampling
    pub fn from_question(question: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: Role::User,
                content: question.into(),
            }],
            temperature: default_temperature(),
            top_p: default_top_p(),
            user: None,
            stream: false,
        }
    }

    /// Position of the most recent user message
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role == Role::User)
    }

    /// Content of the most recent user message
    pub fn last_user_message(&self) -> Option<&str> {
        self.last_user_index().map(|i| self.messages[i].content.as_str())
    }

    /// Turns that came before the most recent user message
    pub fn history(&self) -> &[ChatMessage] {
        match self.last_user_index() {
            Some(index) => &self.messages[..index],
            None => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body returned by `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub object: String,
}

impl ChatResponse {
    /// Single assistant choice wrapping `content`
    pub fn from_message(content: impl Into<String>, context: Option<ResponseContext>) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: Role::Assistant,
                    content: content.into(),
                    context,
                },
            }],
            object: "chat.completion".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ResponseContext>,
}

/// One line of a streamed answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponseChunk {
    pub choices: Vec<ChunkChoice>,
    pub object: String,
}

impl ChatResponseChunk {
    /// Assistant delta; the context is only set on the first chunk of a stream
    pub fn from_delta(content: impl Into<String>, context: Option<ResponseContext>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                index: 0,
                delta: ResponseMessage {
                    role: Role::Assistant,
                    content: content.into(),
                    context,
                },
                finish_reason: None,
            }],
            object: "chat.completion.chunk".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ResponseMessage,
    pub finish_reason: Option<String>,
}

/// Retrieval details returned alongside an answer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseContext {
    /// Source lines placed in the prompt
    pub data_points: Vec<String>,

    /// Search query and prompt, for debugging
    pub thoughts: String,
}
