use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::config::{HeaderConfig, HttpConfig};
use crate::error::{McpError, Result};
use crate::protocol::client::McpTransport;

/// Transport over plain request/response HTTP.
///
/// Every outbound JSON-RPC message is POSTed to the configured endpoint and
/// the response body is queued for `receive`, so the protocol client's
/// id-based correlation works the same as for push transports.
pub struct HttpTransport {
    config: HttpConfig,
    client: Client,
    connected: AtomicBool,
    response_tx: mpsc::Sender<String>,
    response_rx: Mutex<mpsc::Receiver<String>>,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        let (response_tx, response_rx) = mpsc::channel(100);
        Self {
            config,
            client: Client::new(),
            connected: AtomicBool::new(false),
            response_tx,
            response_rx: Mutex::new(response_rx),
        }
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "application/json, text/event-stream"
                .parse()
                .map_err(|_| McpError::InvalidConfig("invalid accept header".to_string()))?,
        );

        for HeaderConfig { name, value } in &self.config.headers {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| McpError::InvalidConfig(format!("invalid header name: {}", e)))?;
            let header_value = value
                .parse()
                .map_err(|_| McpError::InvalidConfig(format!("invalid header value: {}", name)))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    /// Pull JSON payloads out of a response body, which may be a plain JSON
    /// document or an SSE-framed sequence of `data:` lines.
    fn extract_messages(content_type: &str, body: &str) -> Vec<String> {
        if content_type.starts_with("text/event-stream") {
            body.lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|data| data.trim().to_string())
                .filter(|data| !data.is_empty())
                .collect()
        } else {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            }
        }
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.config.url.is_empty() {
            return Err(McpError::InvalidConfig("missing server URL".to_string()));
        }

        info!("HTTP tool server transport ready: {}", self.config.url);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: String) -> Result<()> {
        if !self.is_connected() {
            return Err(McpError::Disconnected);
        }

        let headers = self.build_headers()?;

        let response = self
            .client
            .post(&self.config.url)
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(message)
            .timeout(tokio::time::Duration::from_millis(
                self.config.connect_timeout_ms.max(1000),
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "POST failed: {} - {}",
                status, body
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        for payload in Self::extract_messages(&content_type, &body) {
            debug!("queued response payload: {}", payload);
            if self.response_tx.send(payload).await.is_err() {
                return Err(McpError::Disconnected);
            }
        }

        Ok(())
    }

    async fn receive(&self) -> Result<Option<String>> {
        if !self.is_connected() {
            return Err(McpError::Disconnected);
        }

        let mut rx = self.response_rx.lock().await;
        match tokio::time::timeout(tokio::time::Duration::from_millis(100), rx.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(McpError::Disconnected),
            Err(_) => Ok(None),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_messages_handles_plain_json() {
        let messages =
            HttpTransport::extract_messages("application/json", r#"{"jsonrpc":"2.0","id":1}"#);
        assert_eq!(messages, vec![r#"{"jsonrpc":"2.0","id":1}"#.to_string()]);
    }

    #[test]
    fn extract_messages_handles_sse_framing() {
        let body = "event: message\ndata: {\"id\":1}\n\ndata: {\"id\":2}\n\n";
        let messages = HttpTransport::extract_messages("text/event-stream", body);
        assert_eq!(
            messages,
            vec![r#"{"id":1}"#.to_string(), r#"{"id":2}"#.to_string()]
        );
    }

    #[test]
    fn extract_messages_skips_empty_bodies() {
        assert!(HttpTransport::extract_messages("application/json", "  ").is_empty());
    }

    #[tokio::test]
    async fn send_fails_when_not_connected() {
        let transport = HttpTransport::new(HttpConfig {
            url: "http://localhost:1/mcp".to_string(),
            headers: Vec::new(),
            connect_timeout_ms: 1000,
        });

        let result = transport.send("{}".to_string()).await;
        assert!(matches!(result, Err(McpError::Disconnected)));
    }

    #[tokio::test]
    async fn connect_rejects_empty_url() {
        let mut transport = HttpTransport::new(HttpConfig {
            url: String::new(),
            headers: Vec::new(),
            connect_timeout_ms: 1000,
        });

        assert!(matches!(
            transport.connect().await,
            Err(McpError::InvalidConfig(_))
        ));
    }
}
