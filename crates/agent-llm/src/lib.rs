pub mod provider;
pub mod providers;
pub mod settings;
pub mod stream;
pub mod types;

pub use provider::{LLMError, LLMProvider, LLMStream, Result};
pub use providers::OpenAiProvider;
pub use settings::{provider_from_settings, ModelSettings};
pub use stream::{DecodedStream, StreamDecoder};
pub use types::{CompletionResult, LLMChunk, StreamFunctionCall, StreamToolCall};
