use std::sync::Arc;

use agent_core::tools::{
    parse_tool_args_or_default, Tool, ToolCall, ToolError, ToolExecutor, ToolRegistry, ToolResult,
    ToolSchema,
};
use async_trait::async_trait;

use crate::tools::{FileReadTool, FileSaveTool, FileSearchTool, WebSearchTool};

/// All built-in tool names.
pub const BUILTIN_TOOL_NAMES: [&str; 4] = ["file_read", "file_save", "file_search", "web_search"];

/// Checks whether a tool name refers to a built-in tool.
pub fn is_builtin_tool(name: &str) -> bool {
    BUILTIN_TOOL_NAMES.iter().any(|builtin| *builtin == name)
}

/// Executor over the in-process tool registry.
///
/// Builtin tools are registered once at construction and never removed; a
/// single executor is safely shared across concurrent sessions.
pub struct BuiltinToolExecutor {
    registry: ToolRegistry,
}

impl BuiltinToolExecutor {
    /// Creates a new executor with all built-in tools registered.
    pub fn new() -> Self {
        let registry = ToolRegistry::new();
        Self::register_builtin_tools(&registry);
        Self { registry }
    }

    /// Creates an executor from an existing registry.
    pub fn with_registry(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn register_builtin_tools(registry: &ToolRegistry) {
        let _ = registry.register(FileReadTool::new());
        let _ = registry.register(FileSaveTool::new());
        let _ = registry.register(FileSearchTool::new());
        let _ = registry.register(WebSearchTool::new());
    }

    /// Returns all built-in tool schemas.
    pub fn tool_schemas() -> Vec<ToolSchema> {
        let registry = ToolRegistry::new();
        Self::register_builtin_tools(&registry);
        registry.list_tools()
    }

    /// Registers an additional tool to this executor.
    pub fn register_tool<T: Tool + 'static>(&self, tool: T) -> Result<(), ToolError> {
        self.registry
            .register(tool)
            .map_err(|e| ToolError::Execution(e.to_string()))
    }
}

impl Default for BuiltinToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for BuiltinToolExecutor {
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool_name = call.function.name.as_str();

        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(format!("Tool '{}' not found", tool_name)))?;

        let args = parse_tool_args_or_default(&call.function.arguments);

        log::debug!("executing builtin tool '{}'", tool_name);
        tool.execute(args).await
    }

    fn list_tools(&self) -> Vec<ToolSchema> {
        self.registry.list_tools()
    }
}

/// Builder for constructing a [`BuiltinToolExecutor`] with a custom tool set.
pub struct BuiltinToolExecutorBuilder {
    registry: ToolRegistry,
}

impl BuiltinToolExecutorBuilder {
    pub fn new() -> Self {
        Self {
            registry: ToolRegistry::new(),
        }
    }

    /// Registers all default built-in tools.
    pub fn with_default_tools(self) -> Self {
        BuiltinToolExecutor::register_builtin_tools(&self.registry);
        self
    }

    /// Registers a custom tool.
    pub fn with_tool<T: Tool + 'static>(self, tool: T) -> Result<Self, ToolError> {
        self.registry
            .register(tool)
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(self)
    }

    pub fn build(self) -> BuiltinToolExecutor {
        BuiltinToolExecutor {
            registry: self.registry,
        }
    }
}

impl Default for BuiltinToolExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes a call across tool sources: builtin first, then the session's
/// external tools when the name is not a builtin.
///
/// This is the closed dispatch variant over heterogeneous sources; lookup
/// order, not runtime type inspection, decides where a call goes.
pub struct CompositeToolExecutor {
    builtin: Arc<dyn ToolExecutor>,
    external: Arc<dyn ToolExecutor>,
}

impl CompositeToolExecutor {
    pub fn new(builtin: Arc<dyn ToolExecutor>, external: Arc<dyn ToolExecutor>) -> Self {
        Self { builtin, external }
    }
}

#[async_trait]
impl ToolExecutor for CompositeToolExecutor {
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        match self.builtin.execute(call).await {
            Ok(result) => return Ok(result),
            Err(ToolError::NotFound(_)) => {
                // Fall through to external sources
            }
            Err(e) => return Err(e),
        }

        self.external.execute(call).await
    }

    fn list_tools(&self) -> Vec<ToolSchema> {
        let mut tools = self.builtin.list_tools();
        tools.extend(self.external.list_tools());
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tools::FunctionCall;
    use serde_json::json;

    fn make_tool_call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: args.to_string(),
            },
        }
    }

    struct StaticTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "static tool"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::ok(self.reply))
        }
    }

    #[test]
    fn executor_has_all_builtin_tools() {
        let executor = BuiltinToolExecutor::new();
        let tools = executor.list_tools();

        assert_eq!(tools.len(), BUILTIN_TOOL_NAMES.len());

        let tool_names: Vec<String> = tools.iter().map(|t| t.function.name.clone()).collect();
        for tool_name in BUILTIN_TOOL_NAMES {
            assert!(tool_names.contains(&tool_name.to_string()));
        }
    }

    #[test]
    fn builder_with_empty_registry_has_no_tools() {
        let executor = BuiltinToolExecutorBuilder::new().build();
        assert!(executor.list_tools().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let executor = BuiltinToolExecutor::new();
        let call = make_tool_call("no_such_tool", json!({}));

        let result = executor.execute(&call).await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn malformed_arguments_default_to_empty_object() {
        let executor = BuiltinToolExecutorBuilder::new()
            .with_tool(StaticTool {
                name: "echo_static",
                reply: "ran",
            })
            .unwrap()
            .build();

        let mut call = make_tool_call("echo_static", json!({}));
        call.function.arguments = "{broken json".to_string();

        let result = executor.execute(&call).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn composite_prefers_builtin_and_falls_back_to_external() {
        let builtin = BuiltinToolExecutorBuilder::new()
            .with_tool(StaticTool {
                name: "shared",
                reply: "from-builtin",
            })
            .unwrap()
            .build();
        let external = BuiltinToolExecutorBuilder::new()
            .with_tool(StaticTool {
                name: "shared",
                reply: "from-external",
            })
            .unwrap()
            .with_tool(StaticTool {
                name: "only_external",
                reply: "external-only",
            })
            .unwrap()
            .build();

        let composite = CompositeToolExecutor::new(Arc::new(builtin), Arc::new(external));

        let result = composite
            .execute(&make_tool_call("shared", json!({})))
            .await
            .unwrap();
        assert_eq!(result.result, "from-builtin");

        let result = composite
            .execute(&make_tool_call("only_external", json!({})))
            .await
            .unwrap();
        assert_eq!(result.result, "external-only");
    }

    #[tokio::test]
    async fn composite_lists_tools_from_both_sources() {
        let builtin = BuiltinToolExecutorBuilder::new()
            .with_tool(StaticTool {
                name: "a",
                reply: "",
            })
            .unwrap()
            .build();
        let external = BuiltinToolExecutorBuilder::new()
            .with_tool(StaticTool {
                name: "b",
                reply: "",
            })
            .unwrap()
            .build();

        let composite = CompositeToolExecutor::new(Arc::new(builtin), Arc::new(external));
        assert_eq!(composite.list_tools().len(), 2);
    }
}
