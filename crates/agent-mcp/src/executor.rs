use agent_core::tools::{
    parse_tool_args_or_default, FunctionSchema, ToolCall, ToolError, ToolExecutor, ToolResult,
    ToolSchema,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::McpError;
use crate::manager::McpServerManager;
use crate::tool_index::ToolIndex;
use crate::types::McpContentItem;

/// Tool executor over one session's external tool servers.
pub struct McpToolExecutor {
    manager: Arc<McpServerManager>,
    index: Arc<ToolIndex>,
}

impl McpToolExecutor {
    pub fn new(manager: Arc<McpServerManager>) -> Self {
        let index = manager.tool_index();
        Self { manager, index }
    }

    fn format_result_content(content: &[McpContentItem]) -> String {
        content
            .iter()
            .map(|item| match item {
                McpContentItem::Text { text } => text.clone(),
                McpContentItem::Image { data, mime_type } => {
                    format!("[Image: {} ({} bytes)]", mime_type, data.len())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl ToolExecutor for McpToolExecutor {
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool_name = &call.function.name;

        let alias = match self.index.lookup(tool_name) {
            Some(alias) => alias,
            None => {
                return Err(ToolError::NotFound(format!(
                    "external tool '{}' not found",
                    tool_name
                )));
            }
        };

        debug!(
            "executing external tool: {} (server: {}, original: {})",
            tool_name, alias.server_id, alias.original_name
        );

        let args = parse_tool_args_or_default(&call.function.arguments);

        match self
            .manager
            .call_tool(&alias.server_id, &alias.original_name, args)
            .await
        {
            Ok(result) => {
                let content = Self::format_result_content(&result.content);
                if result.is_error {
                    Ok(ToolResult::failure(content))
                } else {
                    Ok(ToolResult::ok(content))
                }
            }
            Err(McpError::NotConnected(id)) => Ok(ToolResult::failure(format!(
                "tool server '{}' is not connected",
                id
            ))),
            Err(McpError::Timeout(message)) => Ok(ToolResult::failure(format!(
                "tool call timed out: {}",
                message
            ))),
            Err(e) => {
                error!("external tool execution failed: {}", e);
                Err(ToolError::Execution(format!("external tool error: {}", e)))
            }
        }
    }

    fn list_tools(&self) -> Vec<ToolSchema> {
        self.index
            .all_aliases()
            .into_iter()
            .filter_map(|alias| {
                self.manager
                    .get_tool_info(&alias.server_id, &alias.original_name)
                    .map(|tool| ToolSchema {
                        schema_type: "function".to_string(),
                        function: FunctionSchema {
                            name: alias.alias,
                            description: tool.description,
                            parameters: tool.parameters,
                        },
                    })
            })
            .collect()
    }
}
