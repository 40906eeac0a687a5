//! OpenAI-compatible request serialization and response parsing.
//!
//! Most chat-completion providers accept a request/stream shape compatible
//! with OpenAI's API. These helpers build the JSON bodies without leaking
//! internal [`Message`] fields (like `id` / `created_at` / `reasoning`),
//! and decode both response modes back into crate types. Reasoning may come
//! back under the non-standard `reasoning` or `reasoning_content` extension
//! fields; both are folded into the canonical `reasoning`.

use agent_core::{agent::types::Role, tools::ToolSchema, Message};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::provider::{LLMError, Result};
use crate::types::{
    CompletionResult, LLMChunk, StreamFunctionCall, StreamToolCall, WireUsage,
};

/// Convert internal [`Message`] values to an OpenAI-compatible JSON array.
pub fn messages_to_openai_compat_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };

            let mut msg = json!({
                "role": role,
                "content": m.content,
            });

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(name) = &m.name {
                msg["name"] = json!(name);
            }

            if let Some(tool_calls) = &m.tool_calls {
                msg["tool_calls"] = json!(tool_calls);
            }

            msg
        })
        .collect()
}

/// Convert internal [`ToolSchema`] values to the OpenAI `tools` array JSON.
pub fn tools_to_openai_compat_json(tools: &[ToolSchema]) -> Vec<Value> {
    tools.iter().map(|t| json!(t)).collect()
}

/// Sampling parameters attached to every request.
#[derive(Debug, Clone, Copy)]
pub struct RequestParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Build a standard OpenAI-compatible chat request body.
pub fn build_openai_compat_body(
    model: &str,
    messages: &[Message],
    tools: &[ToolSchema],
    params: RequestParams,
    stream: bool,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_openai_compat_json(messages),
        "max_tokens": params.max_tokens,
        "temperature": params.temperature,
        "top_p": params.top_p,
        "stream": stream,
    });

    if !tools.is_empty() {
        body["tools"] = json!(tools_to_openai_compat_json(tools));
    }

    body
}

// --- Non-streaming response parsing ---

#[derive(Debug, Deserialize)]
pub struct OpenAICompatResponse {
    choices: Vec<OpenAICompatResponseChoice>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatResponseChoice {
    message: OpenAICompatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatResponseMessage {
    content: Option<String>,
    reasoning: Option<String>,
    reasoning_content: Option<String>,
    tool_calls: Option<Vec<OpenAICompatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatToolCall {
    id: String,
    #[serde(rename = "type", default)]
    tool_type: Option<String>,
    function: OpenAICompatFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Decode a non-streaming completion response into a [`CompletionResult`].
pub fn parse_openai_compat_response(body: &str) -> Result<CompletionResult> {
    let response: OpenAICompatResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LLMError::Api("response contained no choices".to_string()))?;

    let tool_calls = choice.message.tool_calls.map(|calls| {
        calls
            .into_iter()
            .map(|tc| agent_core::tools::ToolCall {
                id: tc.id,
                tool_type: tc.tool_type.unwrap_or_else(|| "function".to_string()),
                function: agent_core::tools::FunctionCall {
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                },
            })
            .collect::<Vec<_>>()
    });

    Ok(CompletionResult {
        content: choice.message.content,
        reasoning: choice.message.reasoning.or(choice.message.reasoning_content),
        tool_calls: tool_calls.filter(|calls| !calls.is_empty()),
        finish_reason: choice.finish_reason,
        usage: response.usage.into(),
    })
}

// --- Streaming chunk parsing ---

#[derive(Debug, Deserialize)]
pub struct OpenAICompatStreamChunk {
    choices: Vec<OpenAICompatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatChoice {
    delta: OpenAICompatDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAICompatDelta {
    content: Option<String>,
    reasoning: Option<String>,
    reasoning_content: Option<String>,
    tool_calls: Option<Vec<OpenAICompatToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatToolCallDelta {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    #[serde(rename = "type")]
    tool_type: Option<String>,
    function: Option<OpenAICompatFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Convert a single OpenAI-compatible stream chunk into [`LLMChunk`]s.
///
/// A single wire chunk can carry several concerns at once (a content delta
/// plus a finish reason, say), so this returns every decoded piece in order.
pub fn parse_openai_compat_chunk(chunk: OpenAICompatStreamChunk) -> Vec<LLMChunk> {
    let mut out = Vec::new();

    if let Some(usage) = chunk.usage {
        out.push(LLMChunk::Usage(usage.into()));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return out;
    };

    let reasoning = choice
        .delta
        .reasoning
        .or(choice.delta.reasoning_content)
        .filter(|r| !r.is_empty());
    if let Some(reasoning) = reasoning {
        out.push(LLMChunk::Reasoning(reasoning));
    }

    if let Some(content) = choice.delta.content {
        if !content.is_empty() {
            out.push(LLMChunk::Token(content));
        }
    }

    if let Some(tool_calls) = choice.delta.tool_calls {
        let calls: Vec<StreamToolCall> = tool_calls
            .into_iter()
            .map(|tc| StreamToolCall {
                index: tc.index,
                id: tc.id,
                tool_type: tc.tool_type,
                function: tc.function.map(|f| StreamFunctionCall {
                    name: f.name,
                    arguments: f.arguments,
                }),
            })
            .collect();

        if !calls.is_empty() {
            out.push(LLMChunk::ToolCalls(calls));
        }
    }

    if let Some(finish_reason) = choice.finish_reason {
        out.push(LLMChunk::Done {
            finish_reason: Some(finish_reason),
        });
    }

    out
}

/// Parse an SSE `data:` payload from an OpenAI-compatible stream.
///
/// - `"[DONE]"` -> `LLMChunk::Done` without a finish reason (the reason, if
///   any, arrived on the final delta chunk)
/// - Invalid JSON -> error
pub fn parse_openai_compat_sse_data(data: &str) -> Result<Vec<LLMChunk>> {
    if data.trim() == "[DONE]" {
        return Ok(vec![LLMChunk::Done {
            finish_reason: None,
        }]);
    }

    let chunk: OpenAICompatStreamChunk = serde_json::from_str(data)?;
    Ok(parse_openai_compat_chunk(chunk))
}
