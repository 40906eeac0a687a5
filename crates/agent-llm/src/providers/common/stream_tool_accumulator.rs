use std::collections::HashMap;

use agent_core::tools::{FunctionCall, ToolCall};
use uuid::Uuid;

use crate::types::StreamToolCall;

/// Accumulates streaming tool call fragments into complete tool calls.
///
/// OpenAI-compatible providers send tool calls across multiple streaming
/// chunks: the first chunk for an index carries metadata (id, type, function
/// name), subsequent chunks carry only argument text. Fragments are collected
/// per provider-supplied index and converted into complete [`ToolCall`]s only
/// when the stream signals completion.
#[derive(Debug, Default)]
pub struct StreamToolAccumulator {
    tool_calls: HashMap<u32, AccumulatedToolCall>,
}

#[derive(Debug, Clone)]
struct AccumulatedToolCall {
    id: Option<String>,
    tool_type: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl StreamToolAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one chunk's tool-call fragments into the accumulated state.
    /// Metadata fields that are already set are never overwritten.
    pub fn process_chunk(&mut self, stream_calls: &[StreamToolCall]) {
        for call in stream_calls {
            let entry = self
                .tool_calls
                .entry(call.index)
                .or_insert_with(|| AccumulatedToolCall {
                    id: None,
                    tool_type: None,
                    name: None,
                    arguments: String::new(),
                });

            if entry.id.is_none() {
                entry.id = call.id.clone();
            }
            if entry.tool_type.is_none() {
                entry.tool_type = call.tool_type.clone();
            }
            if let Some(function) = &call.function {
                if let Some(name) = &function.name {
                    if entry.name.is_none() {
                        entry.name = Some(name.clone());
                    }
                }
                if let Some(args) = &function.arguments {
                    entry.arguments.push_str(args);
                }
            }
        }
    }

    /// Convert accumulated data into complete [`ToolCall`]s, sorted by index.
    ///
    /// Calls that never received a name are dropped. Argument strings that do
    /// not parse as JSON get one repair attempt (a single appended closing
    /// brace); if that still fails they become `{}` so one malformed call can
    /// never poison the rest of the stream.
    pub fn into_tool_calls(self) -> Vec<ToolCall> {
        let mut calls: Vec<_> = self.tool_calls.into_iter().collect();
        calls.sort_by_key(|(index, _)| *index);

        calls
            .into_iter()
            .filter_map(|(index, acc)| {
                let Some(name) = acc.name else {
                    log::warn!("dropping tool call at index {} with no name", index);
                    return None;
                };

                Some(ToolCall {
                    id: acc
                        .id
                        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                    tool_type: acc.tool_type.unwrap_or_else(|| "function".to_string()),
                    function: FunctionCall {
                        name,
                        arguments: repair_arguments(acc.arguments),
                    },
                })
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tool_calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Validate an assembled argument string, with one repair attempt.
fn repair_arguments(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "{}".to_string();
    }

    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return raw;
    }

    let repaired = format!("{}}}", trimmed);
    if serde_json::from_str::<serde_json::Value>(&repaired).is_ok() {
        log::warn!("repaired truncated tool arguments: '{}'", trimmed);
        return repaired;
    }

    log::warn!("unparseable tool arguments replaced with empty object: '{}'", trimmed);
    "{}".to_string()
}
