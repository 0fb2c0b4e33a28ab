//! LLM relevance judging: prompt templates, completion clients, reply parsing,
//! and the batch labeler.

pub mod labeler;
pub mod mock;
pub mod openai;
pub mod parse;
pub mod prompt;

use crate::error::Result;
use async_trait::async_trait;

pub use labeler::RelevanceLabeler;
pub use mock::MockCompletionClient;
pub use openai::OpenAIChatClient;
pub use parse::{parse_relevance, parse_relevance_lenient, ParseError};
pub use prompt::{PromptPreset, PromptTemplate};

/// One completion call: a single user message, one choice requested.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
}

/// Remote text-completion service.
///
/// Implementations return the trimmed text of the first choice. Network,
/// authentication and status failures are errors; the content itself is not
/// interpreted here.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

