use uuid::Uuid;

use crate::tools::{FunctionCall, ToolCall};

/// A tool call still being assembled from streamed fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToolCall {
    pub id: String,
    pub tool_type: String,
    pub name: String,
    pub arguments: String,
}

/// Accumulates partial tool calls whose argument text arrives split across
/// stream chunks. Fragments carrying neither id nor name extend the most
/// recent partial call.
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    parts: Vec<PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, call: ToolCall) {
        if call.id.is_empty() && call.function.name.is_empty() && call.function.arguments.is_empty()
        {
            return;
        }

        if call.id.is_empty() && call.function.name.is_empty() {
            if let Some(last) = self.parts.last_mut() {
                last.arguments.push_str(&call.function.arguments);
            } else {
                self.parts.push(PartialToolCall {
                    id: String::new(),
                    tool_type: call.tool_type,
                    name: String::new(),
                    arguments: call.function.arguments,
                });
            }
            return;
        }

        let existing = if !call.id.is_empty() {
            self.parts.iter_mut().find(|part| part.id == call.id)
        } else {
            self.parts.iter_mut().find(|part| {
                part.id.is_empty() && (part.name == call.function.name || part.name.is_empty())
            })
        };

        if let Some(existing) = existing {
            existing.arguments.push_str(&call.function.arguments);

            if !call.function.name.is_empty() {
                existing.name = call.function.name;
            }
            if !call.tool_type.is_empty() {
                existing.tool_type = call.tool_type;
            }
        } else {
            self.parts.push(PartialToolCall {
                id: call.id,
                tool_type: call.tool_type,
                name: call.function.name,
                arguments: call.function.arguments,
            });
        }
    }

    pub fn extend<I>(&mut self, calls: I)
    where
        I: IntoIterator<Item = ToolCall>,
    {
        for call in calls {
            self.update(call);
        }
    }

    pub fn finalize(self) -> Vec<ToolCall> {
        finalize_tool_calls(self.parts)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Turns accumulated partials into complete calls. Partials that never
/// received a tool name are dropped; missing ids are generated.
pub fn finalize_tool_calls(parts: Vec<PartialToolCall>) -> Vec<ToolCall> {
    parts
        .into_iter()
        .filter(|part| !part.name.trim().is_empty())
        .map(|part| ToolCall {
            id: if part.id.is_empty() {
                format!("call_{}", Uuid::new_v4())
            } else {
                part.id
            },
            tool_type: if part.tool_type.is_empty() {
                "function".to_string()
            } else {
                part.tool_type
            },
            function: FunctionCall {
                name: part.name,
                arguments: part.arguments,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn accumulator_merges_partial_arguments() {
        let mut accumulator = ToolCallAccumulator::new();

        accumulator.update(make_tool_call("call_1", "file_read", "{\"file_path\": \""));
        accumulator.update(make_tool_call("call_1", "", "/tmp/a.txt"));
        accumulator.update(make_tool_call("call_1", "", "\"}"));

        let calls = accumulator.finalize();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "file_read");
        assert_eq!(
            calls[0].function.arguments,
            "{\"file_path\": \"/tmp/a.txt\"}"
        );
    }

    #[test]
    fn finalize_skips_calls_without_tool_name() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.update(make_tool_call("call_1", "", "{}"));

        assert!(accumulator.finalize().is_empty());
    }

    #[test]
    fn argument_only_chunk_extends_last_partial() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.update(make_tool_call("call_1", "file_search", "{\"pattern\":"));
        accumulator.update(make_tool_call("", "", "\"fn main\"}"));

        let calls = accumulator.finalize();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.arguments, "{\"pattern\":\"fn main\"}");
    }

    #[test]
    fn finalize_generates_missing_ids() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.update(make_tool_call("", "web_search", "{}"));

        let calls = accumulator.finalize();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].id.starts_with("call_"));
    }
}
