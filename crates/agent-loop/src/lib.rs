pub mod config;
pub mod prompt;
pub mod reasoning;
pub mod runner;
pub mod status;
pub mod stream;

pub use config::AgentLoopConfig;
pub use reasoning::{extract_reasoning, ReasoningMarkers};
pub use runner::{execute, execute_with_config, run_agent_loop, run_agent_loop_with_config, ChatOutcome};
pub use status::{agent_status, AgentStatus};
