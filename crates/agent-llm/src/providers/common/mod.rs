pub mod openai_compat;
pub mod sse;
pub mod stream_tool_accumulator;

pub use stream_tool_accumulator::StreamToolAccumulator;
