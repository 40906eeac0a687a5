use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::provider::LLMProvider;
use crate::providers::OpenAiProvider;

/// Model configuration for one completion endpoint, as loaded from whatever
/// configuration store the host application uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider: default_provider(),
            model: model.into(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Build a provider from settings. Every supported provider speaks the
/// OpenAI-compatible protocol; `base_url` selects the actual endpoint.
pub fn provider_from_settings(settings: &ModelSettings) -> Arc<dyn LLMProvider> {
    let mut provider = OpenAiProvider::new(settings.api_key.clone().unwrap_or_default())
        .with_model(settings.model.clone())
        .with_max_tokens(settings.max_tokens)
        .with_temperature(settings.temperature)
        .with_top_p(settings.top_p);

    if let Some(base_url) = &settings.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    Arc::new(provider)
}
