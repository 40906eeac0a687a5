use agent_core::tools::ToolCall;
use agent_core::TokenUsage;
use serde::Deserialize;

/// One decoded delta from a streaming completion response.
#[derive(Debug, Clone, PartialEq)]
pub enum LLMChunk {
    /// Assistant content fragment.
    Token(String),
    /// Reasoning fragment from a provider thinking channel.
    Reasoning(String),
    /// Partial tool-call data, keyed by provider-supplied index.
    ToolCalls(Vec<StreamToolCall>),
    /// Token usage, when the provider reports it on the stream.
    Usage(TokenUsage),
    /// The provider signalled completion of the response.
    Done { finish_reason: Option<String> },
}

/// A fragment of a streamed tool call. The first fragment for an index
/// usually carries id and function name; later ones carry only argument
/// text.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamToolCall {
    pub index: u32,
    pub id: Option<String>,
    pub tool_type: Option<String>,
    pub function: Option<StreamFunctionCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamFunctionCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Canonical decoded completion, independent of provider wire format.
#[derive(Debug, Clone, Default)]
pub struct CompletionResult {
    pub content: Option<String>,
    pub reasoning: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}
