//! Incremental decode of provider deltas into the framed event alphabet.
//!
//! The decoder is an explicit state machine so the two framing invariants
//! are enforced (and testable) in one place:
//!
//! - reasoning and content are mutually exclusive at any instant: a
//!   reasoning bracket is closed (with the full concatenated text) before
//!   any content token is emitted, and vice versa;
//! - tool-call fragments are buffered per provider index and flushed as
//!   complete [`ToolCall`] events only once the stream has finished.

use agent_core::tools::ToolCall;
use agent_core::{AgentEvent, TokenUsage};

use crate::providers::common::StreamToolAccumulator;
use crate::types::LLMChunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Idle,
    InReasoning,
    InContent,
    Done,
    Errored,
}

pub struct StreamDecoder {
    state: DecodeState,
    content: String,
    reasoning: String,
    token_count: usize,
    tools: StreamToolAccumulator,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Idle,
            content: String::new(),
            reasoning: String::new(),
            token_count: 0,
            tools: StreamToolAccumulator::new(),
            tool_calls: Vec::new(),
            finish_reason: None,
            usage: None,
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Feed one provider delta, producing the framed events it unlocks.
    pub fn on_chunk(&mut self, chunk: LLMChunk) -> Vec<AgentEvent> {
        if matches!(self.state, DecodeState::Done | DecodeState::Errored) {
            return Vec::new();
        }

        match chunk {
            LLMChunk::Token(token) => {
                if token.is_empty() {
                    return Vec::new();
                }

                let mut events = self.close_reasoning_if_open();
                self.token_count += token.len();
                self.content.push_str(&token);
                self.state = DecodeState::InContent;
                events.push(AgentEvent::Token { content: token });
                events
            }
            LLMChunk::Reasoning(fragment) => {
                if fragment.is_empty() {
                    return Vec::new();
                }

                let mut events = Vec::new();
                if self.state != DecodeState::InReasoning {
                    self.state = DecodeState::InReasoning;
                    events.push(AgentEvent::ReasoningStart);
                }
                self.reasoning.push_str(&fragment);
                events.push(AgentEvent::Reasoning { content: fragment });
                events
            }
            LLMChunk::ToolCalls(calls) => {
                self.tools.process_chunk(&calls);
                Vec::new()
            }
            LLMChunk::Usage(usage) => {
                self.usage = Some(usage);
                Vec::new()
            }
            LLMChunk::Done { finish_reason } => {
                if self.finish_reason.is_none() {
                    self.finish_reason = finish_reason;
                }
                self.finish()
            }
        }
    }

    /// Finish decoding: close an open reasoning bracket and flush the
    /// buffered tool calls. Idempotent, so a provider `Done` chunk followed
    /// by plain stream exhaustion flushes exactly once.
    pub fn finish(&mut self) -> Vec<AgentEvent> {
        if matches!(self.state, DecodeState::Done | DecodeState::Errored) {
            return Vec::new();
        }

        let mut events = self.close_reasoning_if_open();

        self.tool_calls = std::mem::take(&mut self.tools).into_tool_calls();
        for call in &self.tool_calls {
            events.push(AgentEvent::ToolCall {
                tool_call_id: call.id.clone(),
                tool_name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            });
        }

        self.state = DecodeState::Done;
        events
    }

    /// Record a provider fault. The error frame preempts all further output.
    pub fn on_error(&mut self, message: impl Into<String>) -> Vec<AgentEvent> {
        if self.state == DecodeState::Errored {
            return Vec::new();
        }
        self.state = DecodeState::Errored;
        vec![AgentEvent::Error {
            message: message.into(),
        }]
    }

    pub fn into_output(self) -> DecodedStream {
        DecodedStream {
            content: self.content,
            reasoning: if self.reasoning.is_empty() {
                None
            } else {
                Some(self.reasoning)
            },
            tool_calls: self.tool_calls,
            finish_reason: self.finish_reason,
            usage: self.usage,
            token_count: self.token_count,
        }
    }

    fn close_reasoning_if_open(&mut self) -> Vec<AgentEvent> {
        if self.state == DecodeState::InReasoning {
            vec![AgentEvent::ReasoningEnd {
                reasoning: self.reasoning.clone(),
            }]
        } else {
            Vec::new()
        }
    }
}

/// Everything reassembled from one streamed response.
#[derive(Debug, Clone)]
pub struct DecodedStream {
    pub content: String,
    pub reasoning: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub token_count: usize,
}
