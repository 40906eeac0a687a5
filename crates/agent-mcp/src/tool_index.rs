use crate::types::{McpTool, ToolAlias};
use dashmap::DashMap;

/// Maps exposed tool aliases to their originating server and tool name.
///
/// One index belongs to one session's manager; aliases from different
/// sessions never share a map, so concurrent sessions cannot evict each
/// other's entries.
pub struct ToolIndex {
    /// alias -> (server_id, original_name)
    aliases: DashMap<String, (String, String)>,
    /// server_id -> list of tool names
    server_tools: DashMap<String, Vec<String>>,
}

impl ToolIndex {
    pub fn new() -> Self {
        Self {
            aliases: DashMap::new(),
            server_tools: DashMap::new(),
        }
    }

    /// Alias format: `mcp__{server_id}__{tool_name}`, with `::`/`:` squashed
    /// so the alias stays a valid function name.
    pub fn generate_alias(&self, server_id: &str, tool_name: &str) -> String {
        let sanitized_server = server_id.replace("::", "__").replace(':', "_");
        let sanitized_tool = tool_name.replace("::", "__").replace(':', "_");
        format!("mcp__{}__{}", sanitized_server, sanitized_tool)
    }

    /// Register tools from a server, returning the aliases created.
    pub fn register_server_tools(&self, server_id: &str, tools: &[McpTool]) -> Vec<ToolAlias> {
        let mut aliases = Vec::new();
        let mut tool_names = Vec::new();

        for tool in tools {
            let alias = self.generate_alias(server_id, &tool.name);
            self.aliases
                .insert(alias.clone(), (server_id.to_string(), tool.name.clone()));
            tool_names.push(tool.name.clone());

            aliases.push(ToolAlias {
                alias,
                server_id: server_id.to_string(),
                original_name: tool.name.clone(),
            });
        }

        self.server_tools.insert(server_id.to_string(), tool_names);
        aliases
    }

    /// Remove all tools from a server.
    pub fn remove_server_tools(&self, server_id: &str) {
        if let Some((_, tools)) = self.server_tools.remove(server_id) {
            for tool_name in tools {
                let alias = self.generate_alias(server_id, &tool_name);
                self.aliases.remove(&alias);
            }
        }
    }

    pub fn lookup(&self, alias: &str) -> Option<ToolAlias> {
        self.aliases.get(alias).map(|entry| {
            let (server_id, original_name) = entry.value();
            ToolAlias {
                alias: alias.to_string(),
                server_id: server_id.clone(),
                original_name: original_name.clone(),
            }
        })
    }

    pub fn all_aliases(&self) -> Vec<ToolAlias> {
        self.aliases
            .iter()
            .map(|entry| {
                let (server_id, original_name) = entry.value();
                ToolAlias {
                    alias: entry.key().clone(),
                    server_id: server_id.clone(),
                    original_name: original_name.clone(),
                }
            })
            .collect()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    pub fn clear(&self) {
        self.aliases.clear();
        self.server_tools.clear();
    }
}

impl Default for ToolIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tool(name: &str) -> McpTool {
        McpTool {
            name: name.to_string(),
            description: format!("{name} tool"),
            parameters: serde_json::json!({}),
        }
    }

    #[test]
    fn generate_alias_sanitizes() {
        let index = ToolIndex::new();
        assert_eq!(
            index.generate_alias("filesystem", "read_file"),
            "mcp__filesystem__read_file"
        );
        assert_eq!(
            index.generate_alias("my::server", "tool::name"),
            "mcp__my__server__tool__name"
        );
    }

    #[test]
    fn register_and_lookup() {
        let index = ToolIndex::new();
        let aliases =
            index.register_server_tools("fs", &[make_tool("read_file"), make_tool("write_file")]);
        assert_eq!(aliases.len(), 2);

        let lookup = index.lookup("mcp__fs__read_file").unwrap();
        assert_eq!(lookup.server_id, "fs");
        assert_eq!(lookup.original_name, "read_file");
    }

    #[test]
    fn remove_server_tools_clears_only_that_server() {
        let index = ToolIndex::new();
        index.register_server_tools("fs", &[make_tool("read_file")]);
        index.register_server_tools("web", &[make_tool("search")]);

        index.remove_server_tools("fs");

        assert!(!index.contains("mcp__fs__read_file"));
        assert!(index.contains("mcp__web__search"));
    }
}
