pub mod accumulator;
pub mod args;
pub mod executor;
pub mod registry;
pub mod types;

pub use accumulator::{finalize_tool_calls, PartialToolCall, ToolCallAccumulator};
pub use args::{parse_tool_args, parse_tool_args_or_default};
pub use executor::{ToolError, ToolExecutor};
pub use registry::{RegistryError, SharedTool, Tool, ToolRegistry};
pub use types::{FunctionCall, FunctionSchema, ToolCall, ToolResult, ToolSchema};
