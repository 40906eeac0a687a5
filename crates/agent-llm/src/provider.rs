use crate::types::{CompletionResult, LLMChunk};
use agent_core::{tools::ToolSchema, Message};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(e: reqwest::Error) -> Self {
        LLMError::Http(e.to_string())
    }
}

impl From<reqwest_middleware::Error> for LLMError {
    fn from(e: reqwest_middleware::Error) -> Self {
        LLMError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LLMError>;

pub type LLMStream = Pin<Box<dyn Stream<Item = Result<LLMChunk>> + Send>>;

/// Completion provider contract.
///
/// Both modes take the same inputs: the conversation so far plus the tool
/// descriptors the model may call. A failing `complete` surfaces a single
/// error and never a partial result; a failing stream yields exactly one
/// `Err` item and then ends.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Single request/response chat completion, normalized into the
    /// canonical [`CompletionResult`] shape.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<CompletionResult>;

    /// Streaming chat completion as a sequence of raw provider deltas.
    async fn chat_stream(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<LLMStream>;
}
