use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::{McpServerConfig, TransportConfig};
use crate::error::{McpError, Result};
use crate::protocol::{McpProtocolClient, McpTransport};
use crate::tool_index::ToolIndex;
use crate::transports::{HttpTransport, StdioTransport};
use crate::types::{ConnectionTestReport, McpCallResult, McpTool, RuntimeInfo, ServerStatus};

/// Runtime state for one connected tool server.
struct ServerRuntime {
    config: McpServerConfig,
    client: RwLock<McpProtocolClient>,
    info: RwLock<RuntimeInfo>,
    tools: RwLock<Vec<McpTool>>,
}

fn build_transport(config: &McpServerConfig) -> Box<dyn McpTransport> {
    match &config.transport {
        TransportConfig::Stdio(stdio_config) => Box::new(StdioTransport::new(stdio_config.clone())),
        TransportConfig::Http(http_config) => Box::new(HttpTransport::new(http_config.clone())),
    }
}

/// Session-scoped manager for external tool server connections.
///
/// One instance belongs to one session; construct it explicitly and drop it
/// (after `shutdown_all`) when the session ends. Entries for one session
/// are invisible to every other session's manager.
pub struct McpServerManager {
    runtimes: DashMap<String, Arc<ServerRuntime>>,
    index: Arc<ToolIndex>,
}

impl McpServerManager {
    pub fn new() -> Self {
        Self {
            runtimes: DashMap::new(),
            index: Arc::new(ToolIndex::new()),
        }
    }

    pub fn tool_index(&self) -> Arc<ToolIndex> {
        self.index.clone()
    }

    /// Load every enabled server from a configuration list. A server that
    /// fails to connect is logged and skipped; it never blocks the others.
    pub async fn start_all(&self, configs: &[McpServerConfig]) {
        for server_config in configs {
            if !server_config.enabled {
                continue;
            }

            if let Err(e) = self.start_server(server_config.clone()).await {
                error!("failed to start tool server '{}': {}", server_config.id, e);
            }
        }
    }

    /// Connect to a server, initialize the protocol, and register its tools.
    pub async fn start_server(&self, config: McpServerConfig) -> Result<()> {
        let server_id = config.id.clone();

        if self.runtimes.contains_key(&server_id) {
            return Err(McpError::AlreadyRunning(server_id));
        }

        info!("starting tool server '{}'", server_id);

        let mut client = McpProtocolClient::new(build_transport(&config));

        client.connect().await.map_err(|e| {
            error!("failed to connect to tool server '{}': {}", server_id, e);
            e
        })?;

        let init_result = match client.initialize(config.request_timeout_ms).await {
            Ok(result) => result,
            Err(e) => {
                error!("failed to initialize tool server '{}': {}", server_id, e);
                let _ = client.disconnect().await;
                return Err(e);
            }
        };

        info!(
            "tool server '{}' initialized: {} v{}",
            server_id, init_result.server_info.name, init_result.server_info.version
        );

        let tools = match client.list_tools(config.request_timeout_ms).await {
            Ok(tools) => tools,
            Err(e) => {
                let _ = client.disconnect().await;
                return Err(e);
            }
        };
        info!("tool server '{}' has {} tools", server_id, tools.len());

        let runtime = Arc::new(ServerRuntime {
            config,
            client: RwLock::new(client),
            info: RwLock::new(RuntimeInfo {
                status: ServerStatus::Ready,
                last_error: None,
                connected_at: Some(Utc::now()),
                tool_count: tools.len(),
            }),
            tools: RwLock::new(tools.clone()),
        });

        let aliases = self.index.register_server_tools(&server_id, &tools);
        info!(
            "registered {} external tools for server '{}'",
            aliases.len(),
            server_id
        );

        self.runtimes.insert(server_id, runtime);

        Ok(())
    }

    /// Disconnect a server and drop its tools from the index. Safe to call
    /// for a server that is already stopped.
    pub async fn stop_server(&self, server_id: &str) -> Result<()> {
        let Some((_, runtime)) = self.runtimes.remove(server_id) else {
            return Ok(());
        };

        info!("stopping tool server '{}'", server_id);

        let mut client = runtime.client.write().await;
        if let Err(e) = client.disconnect().await {
            warn!("error disconnecting tool server '{}': {}", server_id, e);
        }

        let mut info = runtime.info.write().await;
        info.status = ServerStatus::Stopped;

        self.index.remove_server_tools(server_id);

        info!("tool server '{}' stopped", server_id);
        Ok(())
    }

    /// Call a tool on a specific server.
    ///
    /// A server that is not currently connected yields `NotConnected`; no
    /// reconnection is attempted here, that is an explicit lifecycle
    /// operation (`start_server`).
    pub async fn call_tool(
        &self,
        server_id: &str,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<McpCallResult> {
        let runtime = {
            let entry = self
                .runtimes
                .get(server_id)
                .ok_or_else(|| McpError::NotConnected(server_id.to_string()))?;
            Arc::clone(entry.value())
        };

        let client = runtime.client.read().await;
        let timeout = runtime.config.request_timeout_ms;

        client.call_tool(tool_name, args, timeout).await
    }

    pub fn get_tool_info(&self, server_id: &str, tool_name: &str) -> Option<McpTool> {
        self.runtimes.get(server_id).and_then(|runtime| {
            let tools = runtime.tools.try_read().ok()?;
            tools.iter().find(|t| t.name == tool_name).cloned()
        })
    }

    pub fn list_servers(&self) -> Vec<String> {
        self.runtimes
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn get_server_info(&self, server_id: &str) -> Option<RuntimeInfo> {
        self.runtimes
            .get(server_id)
            .and_then(|runtime| runtime.info.try_read().ok().map(|info| info.clone()))
    }

    pub fn is_server_running(&self, server_id: &str) -> bool {
        self.runtimes.contains_key(server_id)
    }

    /// Disconnect every server and clear the external tool index. Idempotent;
    /// already-closed connections are skipped without error.
    pub async fn shutdown_all(&self) {
        for server_id in self.list_servers() {
            if let Err(e) = self.stop_server(&server_id).await {
                error!("error stopping server '{}': {}", server_id, e);
            }
        }
        self.index.clear();
    }

    /// Probe a server configuration without registering it: connect,
    /// initialize, list tools, disconnect. Never returns an error, only a
    /// report.
    pub async fn test_connection(config: &McpServerConfig) -> ConnectionTestReport {
        let mut client = McpProtocolClient::new(build_transport(config));

        if let Err(e) = client.connect().await {
            return ConnectionTestReport::failure(format!("connection failed: {}", e));
        }

        if let Err(e) = client.initialize(config.request_timeout_ms).await {
            let _ = client.disconnect().await;
            return ConnectionTestReport::failure(format!("initialize failed: {}", e));
        }

        let report = match client.list_tools(config.request_timeout_ms).await {
            Ok(tools) => ConnectionTestReport {
                success: true,
                message: format!("connection succeeded, found {} tools", tools.len()),
                tools_found: tools.len(),
                tools,
            },
            Err(e) => ConnectionTestReport::failure(format!("tool listing failed: {}", e)),
        };

        let _ = client.disconnect().await;
        report
    }
}

impl Default for McpServerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StdioConfig;
    use std::collections::HashMap;

    fn bad_stdio_config(id: &str) -> McpServerConfig {
        McpServerConfig::new(
            id,
            TransportConfig::Stdio(StdioConfig {
                command: "/nonexistent/tool-server-binary".to_string(),
                args: Vec::new(),
                cwd: None,
                env: HashMap::new(),
            }),
        )
    }

    #[tokio::test]
    async fn start_all_isolates_per_server_failures() {
        let manager = McpServerManager::new();

        manager
            .start_all(&[bad_stdio_config("bad_one"), bad_stdio_config("bad_two")])
            .await;

        assert!(manager.list_servers().is_empty());
    }

    #[tokio::test]
    async fn disabled_servers_are_skipped() {
        let manager = McpServerManager::new();
        let mut config = bad_stdio_config("disabled");
        config.enabled = false;

        manager.start_all(std::slice::from_ref(&config)).await;

        assert!(!manager.is_server_running("disabled"));
    }

    #[tokio::test]
    async fn call_tool_on_unknown_server_is_not_connected() {
        let manager = McpServerManager::new();

        let result = manager
            .call_tool("ghost", "anything", serde_json::json!({}))
            .await;

        assert!(matches!(result, Err(McpError::NotConnected(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn stop_server_is_idempotent() {
        let manager = McpServerManager::new();

        assert!(manager.stop_server("never_started").await.is_ok());
        manager.shutdown_all().await;
        manager.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_connection_reports_failure_instead_of_erroring() {
        let report = McpServerManager::test_connection(&bad_stdio_config("probe")).await;

        assert!(!report.success);
        assert_eq!(report.tools_found, 0);
        assert!(report.message.contains("connection failed"));
    }
}
