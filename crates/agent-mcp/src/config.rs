use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for one external tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique identifier for this server within a session.
    pub id: String,
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether this server should be loaded.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Transport configuration.
    pub transport: TransportConfig,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl McpServerConfig {
    pub fn new(id: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            id: id.into(),
            name: None,
            enabled: true,
            transport,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    60000 // 60 seconds
}

/// Transport configuration variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    Stdio(StdioConfig),
    Http(HttpConfig),
}

/// Local-process stdio transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StdioConfig {
    /// Command to execute.
    pub command: String,
    /// Arguments for the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Environment variables.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Remote HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Endpoint URL accepting JSON-RPC POST requests.
    pub url: String,
    /// Additional headers.
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout() -> u64 {
    10000 // 10 seconds
}

/// HTTP header configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_config_deserializes_with_defaults() {
        let config: McpServerConfig = serde_json::from_str(
            r#"{
                "id": "fs",
                "transport": {"type": "stdio", "command": "mcp-fs"}
            }"#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.request_timeout_ms, 60000);
        match config.transport {
            TransportConfig::Stdio(stdio) => {
                assert_eq!(stdio.command, "mcp-fs");
                assert!(stdio.args.is_empty());
            }
            other => panic!("expected stdio transport, got {other:?}"),
        }
    }

    #[test]
    fn http_config_deserializes() {
        let config: McpServerConfig = serde_json::from_str(
            r#"{
                "id": "remote",
                "transport": {"type": "http", "url": "https://tools.example/mcp"}
            }"#,
        )
        .unwrap();

        match config.transport {
            TransportConfig::Http(http) => {
                assert_eq!(http.url, "https://tools.example/mcp");
                assert_eq!(http.connect_timeout_ms, 10000);
            }
            other => panic!("expected http transport, got {other:?}"),
        }
    }
}
