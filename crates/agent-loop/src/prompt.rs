use agent_core::tools::ToolSchema;

pub const BASE_SYSTEM_PROMPT: &str = "\
You are an intelligent assistant that helps users complete tasks.

You can use the provided tools when a request needs them.

Rules for tool usage:
1. Analyze the user's request carefully
2. Decide whether a tool is needed
3. If so, pick the appropriate tool and supply correct arguments
4. If not, answer the question directly";

/// Build the full system prompt: the base instruction plus a human-readable
/// catalogue of the available tools.
pub fn build_system_prompt(base: Option<&str>, tools: &[ToolSchema]) -> String {
    let base = base.unwrap_or(BASE_SYSTEM_PROMPT);

    if tools.is_empty() {
        return base.to_string();
    }

    let mut prompt = String::from(base);
    prompt.push_str("\n\nAvailable tools:\n");
    for tool in tools {
        prompt.push_str(&format!(
            "- {}: {}\n",
            tool.function.name, tool.function.description
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tools::FunctionSchema;

    fn make_schema(name: &str, description: &str) -> ToolSchema {
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: name.to_string(),
                description: description.to_string(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            },
        }
    }

    #[test]
    fn no_tools_yields_base_prompt_only() {
        let prompt = build_system_prompt(None, &[]);
        assert_eq!(prompt, BASE_SYSTEM_PROMPT);
    }

    #[test]
    fn tool_catalogue_is_appended() {
        let prompt = build_system_prompt(
            None,
            &[
                make_schema("file_read", "Read a file"),
                make_schema("web_search", "Search the web"),
            ],
        );

        assert!(prompt.starts_with(BASE_SYSTEM_PROMPT));
        assert!(prompt.contains("- file_read: Read a file"));
        assert!(prompt.contains("- web_search: Search the web"));
    }

    #[test]
    fn custom_base_prompt_is_used() {
        let prompt = build_system_prompt(Some("Custom base."), &[make_schema("t", "d")]);
        assert!(prompt.starts_with("Custom base."));
    }
}
