//! Token estimation for prompt budgeting

use crate::llm::Role;

/// Average characters per token of English text for GPT-style tokenizers
const DEFAULT_CHARS_PER_TOKEN: f32 = 4.0;

/// Tokens taken by the `role` and `content` keys of a message
const MESSAGE_OVERHEAD: usize = 2;

/// Character based token estimator
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    chars_per_token: f32,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenEstimator {
    pub fn new(chars_per_token: f32) -> Self {
        Self { chars_per_token }
    }

    /// Estimate token count for text
    pub fn estimate(&self, text: &str) -> usize {
        let char_count = text.chars().count();
        (char_count as f32 / self.chars_per_token).ceil() as usize
    }

    /// Estimate the tokens of one chat message
    pub fn estimate_message(&self, role: Role, content: &str) -> usize {
        MESSAGE_OVERHEAD + self.estimate(role.as_str()) + self.estimate(content)
    }
}
