//! MCP (Model Context Protocol) client library.
//!
//! This crate lets the agent connect to external tool servers over stdio or
//! HTTP, list their tools, and call them. Server connections are owned by a
//! session-scoped [`McpServerManager`]; nothing in here is global state.

pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod protocol;
pub mod tool_index;
pub mod transports;
pub mod types;

pub use config::{HeaderConfig, HttpConfig, McpServerConfig, StdioConfig, TransportConfig};
pub use error::{McpError, Result};
pub use executor::McpToolExecutor;
pub use manager::McpServerManager;
pub use protocol::{McpProtocolClient, McpTransport};
pub use tool_index::ToolIndex;
pub use types::{ConnectionTestReport, McpCallResult, McpContentItem, McpTool, ServerStatus};
