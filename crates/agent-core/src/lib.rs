pub mod agent;
pub mod tools;

pub use agent::error::AgentError;
pub use agent::events::{AgentEvent, TokenUsage};
pub use agent::types::{Message, Role, Session};
pub use tools::{
    parse_tool_args, parse_tool_args_or_default, FunctionCall, FunctionSchema, Tool, ToolCall,
    ToolCallAccumulator, ToolError, ToolExecutor, ToolRegistry, ToolResult, ToolSchema,
};
