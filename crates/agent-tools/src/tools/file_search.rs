use agent_core::tools::{Tool, ToolError, ToolResult};
use async_trait::async_trait;
use regex::RegexBuilder;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use walkdir::WalkDir;

const DEFAULT_MAX_RESULTS: usize = 100;

/// Tool for searching file contents under a directory with a regex pattern.
pub struct FileSearchTool;

#[derive(Debug, Serialize)]
struct SearchMatch {
    file_path: String,
    line_number: usize,
    line_content: String,
}

impl FileSearchTool {
    pub fn new() -> Self {
        Self
    }

    fn matches_file_pattern(name: &str, pattern: &str) -> bool {
        // Glob-lite: '*' matches any run of characters, '?' a single one.
        let mut regex = String::from("^");
        for ch in pattern.chars() {
            match ch {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                other => regex.push_str(&regex::escape(&other.to_string())),
            }
        }
        regex.push('$');

        regex::Regex::new(&regex)
            .map(|re| re.is_match(name))
            .unwrap_or(false)
    }

    fn search(
        directory: &str,
        pattern: &str,
        file_pattern: Option<&str>,
        case_sensitive: bool,
        max_results: usize,
    ) -> Result<Vec<SearchMatch>, String> {
        let dir_path = Path::new(directory);
        if !dir_path.exists() {
            return Err(format!("Directory does not exist: {}", directory));
        }
        if !dir_path.is_dir() {
            return Err(format!("Path is not a directory: {}", directory));
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| format!("Invalid search pattern: {}", e))?;

        let mut results = Vec::new();

        for entry in WalkDir::new(dir_path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Some(file_pattern) = file_pattern {
                let name = entry.file_name().to_string_lossy();
                if !Self::matches_file_pattern(&name, file_pattern) {
                    continue;
                }
            }

            // Binary or unreadable files are skipped silently
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };

            for (index, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    results.push(SearchMatch {
                        file_path: entry.path().display().to_string(),
                        line_number: index + 1,
                        line_content: line.trim_end().to_string(),
                    });

                    if results.len() >= max_results {
                        return Ok(results);
                    }
                }
            }
        }

        Ok(results)
    }
}

impl Default for FileSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileSearchTool {
    fn name(&self) -> &str {
        "file_search"
    }

    fn description(&self) -> &str {
        "Search file contents under a directory with a regular expression, optionally filtered by file name pattern."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory to search in"
                },
                "pattern": {
                    "type": "string",
                    "description": "Regular expression to match against file lines"
                },
                "file_pattern": {
                    "type": "string",
                    "description": "Optional file name filter, e.g. *.rs or *.txt"
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Case sensitive matching, defaults to false"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of matches to return, defaults to 100"
                }
            },
            "required": ["directory", "pattern"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult, ToolError> {
        let directory = args["directory"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'directory' parameter".to_string())
        })?;
        let pattern = args["pattern"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'pattern' parameter".to_string()))?;
        let file_pattern = args["file_pattern"].as_str().map(str::to_string);
        let case_sensitive = args["case_sensitive"].as_bool().unwrap_or(false);
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let directory = directory.to_string();
        let pattern = pattern.to_string();

        // Directory walk is blocking I/O
        let outcome = tokio::task::spawn_blocking(move || {
            Self::search(
                &directory,
                &pattern,
                file_pattern.as_deref(),
                case_sensitive,
                max_results,
            )
        })
        .await
        .map_err(|e| ToolError::Execution(format!("search task failed: {}", e)))?;

        match outcome {
            Ok(matches) => {
                let payload = json!({
                    "total_matches": matches.len(),
                    "results": matches,
                });
                Ok(ToolResult::ok(payload.to_string()))
            }
            Err(e) => Ok(ToolResult::failure(e)),
        }
    }
}
