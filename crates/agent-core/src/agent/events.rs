use crate::tools::ToolResult;
use serde::{Deserialize, Serialize};

/// Framed streaming event alphabet.
///
/// A well-formed stream is a sequence of these frames terminated by exactly
/// one `Complete` or one turn-ending `Error`. Reasoning frames are always
/// bracketed: `ReasoningStart`, zero or more `Reasoning` fragments, then one
/// `ReasoningEnd` carrying the full concatenated text. Reasoning and content
/// never interleave within a bracket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Token {
        content: String,
    },

    ReasoningStart,

    Reasoning {
        content: String,
    },

    ReasoningEnd {
        reasoning: String,
    },

    /// A fully assembled tool-call request, emitted once its argument
    /// fragments have been completely received.
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        arguments: String,
    },

    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: ToolResult,
    },

    Complete {
        usage: TokenUsage,
    },

    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
