use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::time::Duration;

use crate::provider::{LLMError, LLMProvider, LLMStream, Result};
use crate::providers::common::openai_compat::{
    build_openai_compat_body, parse_openai_compat_response, parse_openai_compat_sse_data,
    RequestParams,
};
use crate::providers::common::sse::llm_stream_from_sse;
use crate::types::CompletionResult;
use agent_core::{tools::ToolSchema, Message};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 60;
const MAX_RETRIES: u32 = 3;

/// Provider for OpenAI-compatible chat completion endpoints.
///
/// Transient HTTP failures are retried up to [`MAX_RETRIES`] times with
/// exponential backoff; the connect and per-read timeouts apply to both
/// request modes.
pub struct OpenAiProvider {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    model: String,
    params: RequestParams,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let inner = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            params: RequestParams {
                max_tokens: 4096,
                temperature: 0.7,
                top_p: 1.0,
            },
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.params.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.params.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.params.top_p = top_p;
        self
    }

    async fn send_request(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        stream: bool,
    ) -> Result<reqwest::Response> {
        let body = build_openai_compat_body(&self.model, messages, tools, self.params, stream);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::Api(format!("HTTP {}: {}", status, text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<CompletionResult> {
        log::debug!(
            "chat completion: model={}, messages={}, tools={}",
            self.model,
            messages.len(),
            tools.len()
        );

        let response = self.send_request(messages, tools, false).await?;
        let body = response.text().await?;
        parse_openai_compat_response(&body)
    }

    async fn chat_stream(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<LLMStream> {
        log::debug!(
            "streaming chat completion: model={}, messages={}, tools={}",
            self.model,
            messages.len(),
            tools.len()
        );

        let response = self.send_request(messages, tools, true).await?;

        let stream = llm_stream_from_sse(response, |_event, data| {
            if data.trim().is_empty() {
                return Ok(vec![]);
            }
            parse_openai_compat_sse_data(data)
        });

        Ok(stream)
    }
}
