use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tool metadata reported by an external server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Result of calling an external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpCallResult {
    pub content: Vec<McpContentItem>,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McpContentItem {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { data: String, mime_type: String },
}

/// Server runtime status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Ready,
    Stopped,
    Error,
}

/// Runtime information for a connected server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub status: ServerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    pub tool_count: usize,
}

/// Outcome of probing a server configuration without registering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestReport {
    pub success: bool,
    pub message: String,
    pub tools_found: usize,
    #[serde(default)]
    pub tools: Vec<McpTool>,
}

impl ConnectionTestReport {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            tools_found: 0,
            tools: Vec::new(),
        }
    }
}

/// Tool alias mapping.
#[derive(Debug, Clone)]
pub struct ToolAlias {
    pub alias: String,
    pub server_id: String,
    pub original_name: String,
}
