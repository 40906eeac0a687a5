use agent_core::tools::{Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com";
const DEFAULT_MAX_RESULTS: usize = 10;

/// Web search tool backed by the DuckDuckGo instant-answer API.
pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Override the API endpoint (used by tests to point at a local server).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("no_redirect", "1"),
            ])
            .send()
            .await
            .map_err(|e| format!("Search request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Search request failed with status {}",
                response.status()
            ));
        }

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| format!("Invalid search response: {}", e))?;

        let mut results = Vec::new();

        if !answer.abstract_text.is_empty() {
            results.push(SearchResult {
                title: answer.heading,
                url: answer.abstract_url,
                snippet: answer.abstract_text,
            });
        }

        for topic in answer.related_topics {
            if results.len() >= max_results {
                break;
            }
            if topic.text.is_empty() || topic.first_url.is_empty() {
                continue;
            }
            results.push(SearchResult {
                title: topic.text.clone(),
                url: topic.first_url,
                snippet: topic.text,
            });
        }

        results.truncate(max_results);
        Ok(results)
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for a query and return result titles, URLs and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results, defaults to 10"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' parameter".to_string()))?;
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        match self.search(query, max_results).await {
            Ok(results) => {
                let payload = json!({
                    "query": query,
                    "total_results": results.len(),
                    "results": results,
                });
                Ok(ToolResult::ok(payload.to_string()))
            }
            Err(e) => Ok(ToolResult::failure(e)),
        }
    }
}
