use agent_core::tools::{ToolCall, ToolError, ToolExecutor, ToolResult};

/// Dispatch one tool call, total over every failure mode.
///
/// An unknown name, bad arguments, or an execution fault all come back as a
/// structured failure result; nothing raised here ever aborts the turn.
pub async fn dispatch_tool_call(call: &ToolCall, tools: &dyn ToolExecutor) -> ToolResult {
    match tools.execute(call).await {
        Ok(result) => result,
        Err(ToolError::NotFound(_)) => {
            log::warn!("tool '{}' not found", call.function.name);
            ToolResult::failure(format!("Tool '{}' not found", call.function.name))
        }
        Err(e) => {
            log::warn!("tool '{}' failed: {}", call.function.name, e);
            ToolResult::failure(e.to_string())
        }
    }
}
