use agent_core::tools::{Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use tokio::fs;

/// Tool for saving text content to a file, creating parent directories as
/// needed.
pub struct FileSaveTool;

impl FileSaveTool {
    pub fn new() -> Self {
        Self
    }

    pub async fn save_file(path: &str, text: &str) -> Result<u64, String> {
        if path.contains("..") {
            return Err("Invalid path: contains '..'".to_string());
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| format!("Failed to create directory '{}': {}", parent.display(), e))?;
            }
        }

        fs::write(path, text)
            .await
            .map_err(|e| format!("Failed to write file '{}': {}", path, e))?;

        let metadata = fs::metadata(path)
            .await
            .map_err(|e| format!("Failed to stat file '{}': {}", path, e))?;

        Ok(metadata.len())
    }
}

impl Default for FileSaveTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileSaveTool {
    fn name(&self) -> &str {
        "file_save"
    }

    fn description(&self) -> &str {
        "Save text content to a file. Missing parent directories are created."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "Path of the file to write"
                },
                "text": {
                    "type": "string",
                    "description": "Text content to save"
                }
            },
            "required": ["filepath", "text"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = args["filepath"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'filepath' parameter".to_string())
        })?;
        let text = args["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' parameter".to_string()))?;

        match Self::save_file(path, text).await {
            Ok(size) => Ok(ToolResult::ok(format!(
                "File saved to {} ({} bytes)",
                path, size
            ))),
            Err(e) => Ok(ToolResult::failure(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_file_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.txt");
        let path_str = path.to_str().unwrap();

        let tool = FileSaveTool::new();
        let result = tool
            .execute(json!({"filepath": path_str, "text": "saved"}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "saved");
    }

    #[tokio::test]
    async fn save_file_reports_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let tool = FileSaveTool::new();
        let result = tool
            .execute(json!({"filepath": path.to_str().unwrap(), "text": "12345"}))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.result.contains("5 bytes"));
    }

    #[tokio::test]
    async fn save_file_missing_text_errors() {
        let tool = FileSaveTool::new();
        let result = tool.execute(json!({"filepath": "/tmp/x.txt"})).await;

        assert!(result.is_err());
    }
}
