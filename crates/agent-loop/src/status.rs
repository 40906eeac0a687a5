use agent_llm::ModelSettings;
use serde::{Deserialize, Serialize};

/// Readiness of the agent for a caller: whether a usable default model
/// configuration exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub ready: bool,
    pub message: String,
}

/// Read-only status check over whatever configuration storage the host
/// provides; `settings` is the caller's default model configuration, if any.
pub fn agent_status(settings: Option<&ModelSettings>) -> AgentStatus {
    match settings {
        Some(settings) => AgentStatus {
            ready: true,
            message: format!("Agent ready, using model: {}", settings.model),
        },
        None => AgentStatus {
            ready: false,
            message: "Agent not ready, configure a default model first".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_when_settings_exist() {
        let settings = ModelSettings::new("gpt-4o-mini");
        let status = agent_status(Some(&settings));

        assert!(status.ready);
        assert!(status.message.contains("gpt-4o-mini"));
    }

    #[test]
    fn not_ready_without_settings() {
        let status = agent_status(None);

        assert!(!status.ready);
        assert!(status.message.contains("configure a default model"));
    }
}
