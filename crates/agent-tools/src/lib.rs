//! Built-in tools and the dispatch layer over tool sources.
//!
//! Tools implement the `Tool` trait from `agent-core` and are registered in
//! a `ToolRegistry`. The `CompositeToolExecutor` routes calls across the
//! shared builtin registry and a session's external tools.

mod dispatch;
mod executor;
pub mod tools;

pub use dispatch::dispatch_tool_call;
pub use executor::{
    is_builtin_tool, BuiltinToolExecutor, BuiltinToolExecutorBuilder, CompositeToolExecutor,
    BUILTIN_TOOL_NAMES,
};
pub use tools::{FileReadTool, FileSaveTool, FileSearchTool, WebSearchTool};
