use crate::tools::ToolError;
use serde_json::Value;

/// Parse a tool-call argument string into a JSON value.
///
/// An empty or whitespace-only string is treated as `{}`, matching what
/// providers send for parameterless calls.
pub fn parse_tool_args(raw: &str) -> Result<Value, ToolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_str(trimmed)
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid JSON arguments: {}", e)))
}

/// Lenient variant used on the dispatch path: malformed arguments become an
/// empty object instead of failing the call.
pub fn parse_tool_args_or_default(raw: &str) -> Value {
    parse_tool_args(raw).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}
