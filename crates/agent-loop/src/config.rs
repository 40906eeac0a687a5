use crate::reasoning::ReasoningMarkers;

/// Configuration for the agent loop.
pub struct AgentLoopConfig {
    /// Upper bound on model-call iterations for one turn.
    pub max_iterations: usize,
    /// Base system prompt; the tool catalogue is appended to it.
    pub system_prompt: Option<String>,
    /// Markers tried when recovering reasoning from plain content.
    pub reasoning_markers: ReasoningMarkers,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            system_prompt: None,
            reasoning_markers: ReasoningMarkers::default(),
        }
    }
}
