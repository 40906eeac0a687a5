use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agent_core::tools::{ToolCall, ToolExecutor, ToolResult};
use agent_core::{AgentError, AgentEvent, Message, Role, Session, TokenUsage};
use agent_llm::LLMProvider;
use agent_tools::dispatch_tool_call;

use crate::config::AgentLoopConfig;
use crate::prompt::build_system_prompt;
use crate::reasoning::extract_reasoning;
use crate::stream::handler::consume_llm_stream;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Terminal message when a turn hits the iteration bound.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "Maximum number of iterations reached without completing the task";

/// Final outcome of one non-streaming turn.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub content: Option<String>,
    pub reasoning: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
    pub iterations: usize,
}

/// Set up the turn's conversation: system prompt (with tool catalogue)
/// first, prior history untouched, then the new user message. After this
/// point messages are only appended, never mutated.
fn prepare_conversation(
    session: &mut Session,
    config: &AgentLoopConfig,
    tools: &dyn ToolExecutor,
    user_message: String,
) {
    let system_prompt = build_system_prompt(config.system_prompt.as_deref(), &tools.list_tools());

    if let Some(system_message) = session
        .messages
        .iter_mut()
        .find(|message| matches!(message.role, Role::System))
    {
        system_message.content = system_prompt;
    } else {
        session.messages.insert(0, Message::system(system_prompt));
    }

    session.add_message(Message::user(user_message));
}

fn stringify_tool_result(result: &ToolResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|_| result.result.clone())
}

/// Run one turn against the non-streaming completion contract.
///
/// Loops model call -> tool dispatch until the model answers without tool
/// calls or the iteration bound is hit. A provider fault aborts the turn.
pub async fn execute_with_config(
    session: &mut Session,
    user_message: String,
    llm: Arc<dyn LLMProvider>,
    tools: Arc<dyn ToolExecutor>,
    config: AgentLoopConfig,
) -> Result<ChatOutcome> {
    let session_id = session.id.clone();
    prepare_conversation(session, &config, tools.as_ref(), user_message);

    for iteration in 1..=config.max_iterations {
        log::debug!(
            "[{}] iteration {}/{}, {} messages",
            session_id,
            iteration,
            config.max_iterations,
            session.messages.len()
        );

        let tool_schemas = tools.list_tools();
        let mut result = llm
            .complete(&session.messages, &tool_schemas)
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        // Providers without a native reasoning channel sometimes leave the
        // reasoning inline in the content
        if result.reasoning.is_none() {
            if let Some(content) = result.content.as_deref() {
                if let Some((reasoning, cleaned)) =
                    extract_reasoning(content, &config.reasoning_markers)
                {
                    result.reasoning = Some(reasoning);
                    result.content = cleaned;
                }
            }
        }

        let Some(tool_calls) = result.tool_calls else {
            let mut assistant =
                Message::assistant(result.content.clone().unwrap_or_default(), None);
            assistant.reasoning = result.reasoning.clone();
            session.add_message(assistant);

            return Ok(ChatOutcome {
                content: result.content,
                reasoning: result.reasoning,
                tool_calls: None,
                finish_reason: result.finish_reason,
                usage: result.usage,
                iterations: iteration,
            });
        };

        session.add_message(Message::assistant(
            result.content.clone().unwrap_or_default(),
            Some(tool_calls.clone()),
        ));

        for tool_call in &tool_calls {
            log::info!(
                "[{}] executing tool '{}'",
                session_id,
                tool_call.function.name
            );

            let tool_result = dispatch_tool_call(tool_call, tools.as_ref()).await;

            session.add_message(Message::tool_result(
                tool_call.id.clone(),
                tool_call.function.name.clone(),
                stringify_tool_result(&tool_result),
            ));
        }
    }

    log::warn!("[{}] iteration bound reached", session_id);
    Ok(ChatOutcome {
        content: Some(MAX_ITERATIONS_MESSAGE.to_string()),
        reasoning: None,
        tool_calls: None,
        finish_reason: Some("max_iterations".to_string()),
        usage: TokenUsage::default(),
        iterations: config.max_iterations,
    })
}

/// Run one turn with default configuration.
pub async fn execute(
    session: &mut Session,
    user_message: String,
    llm: Arc<dyn LLMProvider>,
    tools: Arc<dyn ToolExecutor>,
) -> Result<ChatOutcome> {
    execute_with_config(session, user_message, llm, tools, AgentLoopConfig::default()).await
}

/// Run one turn against the streaming contract, emitting framed events.
///
/// The consumer sees one continuous stream: content/reasoning frames as they
/// arrive, tool-call frames at each sentinel, tool-result frames as dispatch
/// completes, then either a completion frame or a terminal error frame.
pub async fn run_agent_loop_with_config(
    session: &mut Session,
    user_message: String,
    event_tx: mpsc::Sender<AgentEvent>,
    llm: Arc<dyn LLMProvider>,
    tools: Arc<dyn ToolExecutor>,
    cancel_token: CancellationToken,
    config: AgentLoopConfig,
) -> Result<()> {
    let session_id = session.id.clone();
    prepare_conversation(session, &config, tools.as_ref(), user_message);

    for iteration in 0..config.max_iterations {
        if cancel_token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        // Consumer is gone, stop issuing provider calls
        if event_tx.is_closed() {
            log::debug!("[{}] event consumer disconnected", session_id);
            return Err(AgentError::Cancelled);
        }

        log::debug!(
            "[{}] streaming iteration {}/{}",
            session_id,
            iteration + 1,
            config.max_iterations
        );

        let tool_schemas = tools.list_tools();
        let stream = match llm.chat_stream(&session.messages, &tool_schemas).await {
            Ok(stream) => stream,
            Err(error) => {
                let _ = event_tx
                    .send(AgentEvent::Error {
                        message: error.to_string(),
                    })
                    .await;
                return Err(AgentError::Llm(error.to_string()));
            }
        };

        let output = consume_llm_stream(stream, &event_tx, &cancel_token).await?;

        if output.tool_calls.is_empty() {
            let mut assistant = Message::assistant(output.content, None);
            assistant.reasoning = output.reasoning;
            session.add_message(assistant);

            let usage = output.usage.unwrap_or(TokenUsage {
                prompt_tokens: 0,
                completion_tokens: output.token_count as u32,
                total_tokens: output.token_count as u32,
            });
            let _ = event_tx.send(AgentEvent::Complete { usage }).await;
            return Ok(());
        }

        let mut assistant = Message::assistant(output.content, Some(output.tool_calls.clone()));
        assistant.reasoning = output.reasoning;
        session.add_message(assistant);

        for tool_call in &output.tool_calls {
            log::info!(
                "[{}] executing tool '{}'",
                session_id,
                tool_call.function.name
            );

            let tool_result = dispatch_tool_call(tool_call, tools.as_ref()).await;

            // A failed dispatch is reported inline but never ends the turn;
            // the failure also goes back to the model as a tool message.
            if !tool_result.success {
                let _ = event_tx
                    .send(AgentEvent::Error {
                        message: format!(
                            "Tool '{}' failed: {}",
                            tool_call.function.name, tool_result.result
                        ),
                    })
                    .await;
            }

            let _ = event_tx
                .send(AgentEvent::ToolResult {
                    tool_call_id: tool_call.id.clone(),
                    tool_name: tool_call.function.name.clone(),
                    result: tool_result.clone(),
                })
                .await;

            session.add_message(Message::tool_result(
                tool_call.id.clone(),
                tool_call.function.name.clone(),
                stringify_tool_result(&tool_result),
            ));
        }
    }

    log::warn!("[{}] iteration bound reached", session_id);
    let _ = event_tx
        .send(AgentEvent::Error {
            message: MAX_ITERATIONS_MESSAGE.to_string(),
        })
        .await;
    Ok(())
}

/// Run one streaming turn with default configuration.
pub async fn run_agent_loop(
    session: &mut Session,
    user_message: String,
    event_tx: mpsc::Sender<AgentEvent>,
    llm: Arc<dyn LLMProvider>,
    tools: Arc<dyn ToolExecutor>,
    cancel_token: CancellationToken,
) -> Result<()> {
    run_agent_loop_with_config(
        session,
        user_message,
        event_tx,
        llm,
        tools,
        cancel_token,
        AgentLoopConfig::default(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::stream;

    use agent_core::tools::{FunctionCall, Tool, ToolError, ToolSchema};
    use agent_llm::provider::Result as LLMResult;
    use agent_llm::types::{CompletionResult, StreamFunctionCall, StreamToolCall};
    use agent_llm::{LLMChunk, LLMError, LLMStream};
    use agent_tools::{BuiltinToolExecutor, BuiltinToolExecutorBuilder, CompositeToolExecutor};

    // --- Scripted provider ---

    #[derive(Default)]
    struct ScriptedProvider {
        completions: Mutex<VecDeque<CompletionResult>>,
        streams: Mutex<VecDeque<Vec<LLMResult<LLMChunk>>>>,
        /// When the script runs dry, keep replaying the last response.
        repeat_last: bool,
        /// Message count observed at each provider call.
        call_log: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn with_completions(responses: Vec<CompletionResult>) -> Self {
            Self {
                completions: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        fn with_streams(streams: Vec<Vec<LLMResult<LLMChunk>>>) -> Self {
            Self {
                streams: Mutex::new(streams.into()),
                ..Default::default()
            }
        }

        fn repeating(mut self) -> Self {
            self.repeat_last = true;
            self
        }

        fn calls(&self) -> usize {
            self.call_log.lock().unwrap().len()
        }

        fn messages_at_call(&self, index: usize) -> Vec<Message> {
            self.call_log.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolSchema],
        ) -> LLMResult<CompletionResult> {
            self.call_log.lock().unwrap().push(messages.to_vec());

            let mut script = self.completions.lock().unwrap();
            let next = script
                .pop_front()
                .ok_or_else(|| LLMError::Api("script exhausted".to_string()))?;
            if self.repeat_last && script.is_empty() {
                script.push_back(next.clone());
            }
            Ok(next)
        }

        async fn chat_stream(
            &self,
            messages: &[Message],
            _tools: &[ToolSchema],
        ) -> LLMResult<LLMStream> {
            self.call_log.lock().unwrap().push(messages.to_vec());

            let mut script = self.streams.lock().unwrap();
            let next = script
                .pop_front()
                .ok_or_else(|| LLMError::Api("script exhausted".to_string()))?;
            if self.repeat_last && script.is_empty() {
                script.push_back(clone_stream_script(&next));
            }
            Ok(Box::pin(stream::iter(next)))
        }
    }

    fn clone_stream_script(script: &[LLMResult<LLMChunk>]) -> Vec<LLMResult<LLMChunk>> {
        script
            .iter()
            .map(|item| match item {
                Ok(chunk) => Ok(chunk.clone()),
                Err(e) => Err(LLMError::Api(e.to_string())),
            })
            .collect()
    }

    fn content_response(content: &str, finish_reason: &str) -> CompletionResult {
        CompletionResult {
            content: Some(content.to_string()),
            reasoning: None,
            tool_calls: None,
            finish_reason: Some(finish_reason.to_string()),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        }
    }

    fn tool_call_response(name: &str, arguments: &str) -> CompletionResult {
        CompletionResult {
            content: None,
            reasoning: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                tool_type: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }]),
            finish_reason: Some("tool_calls".to_string()),
            usage: TokenUsage::default(),
        }
    }

    fn tool_call_stream(name: &str, arguments: &str) -> Vec<LLMResult<LLMChunk>> {
        vec![
            Ok(LLMChunk::ToolCalls(vec![StreamToolCall {
                index: 0,
                id: Some("call_1".to_string()),
                tool_type: Some("function".to_string()),
                function: Some(StreamFunctionCall {
                    name: Some(name.to_string()),
                    arguments: Some(arguments.to_string()),
                }),
            }])),
            Ok(LLMChunk::Done {
                finish_reason: Some("tool_calls".to_string()),
            }),
        ]
    }

    // --- Scripted tool ---

    struct StaticTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "scripted tool"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }

        async fn execute(
            &self,
            _args: serde_json::Value,
        ) -> std::result::Result<ToolResult, ToolError> {
            Ok(ToolResult::ok(self.reply))
        }
    }

    fn executor_with_file_read() -> Arc<dyn ToolExecutor> {
        Arc::new(
            BuiltinToolExecutorBuilder::new()
                .with_tool(StaticTool {
                    name: "file_read",
                    reply: "file contents: hello",
                })
                .unwrap()
                .build(),
        )
    }

    fn empty_executor() -> Arc<dyn ToolExecutor> {
        Arc::new(BuiltinToolExecutorBuilder::new().build())
    }

    async fn collect_events(rx: &mut mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    // --- Non-streaming ---

    #[tokio::test]
    async fn direct_answer_completes_in_one_iteration() {
        let provider = Arc::new(ScriptedProvider::with_completions(vec![content_response(
            "The /tmp directory holds temporary files.",
            "stop",
        )]));
        let mut session = Session::new("s1");

        let outcome = execute(
            &mut session,
            "list files in /tmp".to_string(),
            provider.clone(),
            empty_executor(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.iterations, 1);
        assert_eq!(
            outcome.content.as_deref(),
            Some("The /tmp directory holds temporary files.")
        );
        assert!(outcome.tool_calls.is_none());
        assert_eq!(outcome.finish_reason.as_deref(), Some("stop"));
        assert_eq!(outcome.usage.total_tokens, 15);

        // System prompt first, then the user message
        let first_call = provider.messages_at_call(0);
        assert!(matches!(first_call[0].role, Role::System));
        assert_eq!(first_call[1].content, "list files in /tmp");
    }

    #[tokio::test]
    async fn tool_call_adds_messages_and_takes_two_iterations() {
        let provider = Arc::new(ScriptedProvider::with_completions(vec![
            tool_call_response("file_read", r#"{"file_path": "/tmp/a.txt"}"#),
            content_response("The file says hello.", "stop"),
        ]));
        let mut session = Session::new("s2");

        let outcome = execute(
            &mut session,
            "read /tmp/a.txt".to_string(),
            provider.clone(),
            executor_with_file_read(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.content.as_deref(), Some("The file says hello."));

        // The second model call must already see the assistant tool request
        // and the tool result message
        let second_call = provider.messages_at_call(1);
        let assistant = second_call
            .iter()
            .find(|m| matches!(m.role, Role::Assistant))
            .expect("assistant message");
        assert!(assistant.tool_calls.is_some());

        let tool_message = second_call
            .iter()
            .find(|m| matches!(m.role, Role::Tool))
            .expect("tool message");
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_message.name.as_deref(), Some("file_read"));
        assert!(tool_message.content.contains("file contents: hello"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_failure_message_not_abort() {
        let provider = Arc::new(ScriptedProvider::with_completions(vec![
            tool_call_response("no_such_tool", "{}"),
            content_response("I could not use that tool.", "stop"),
        ]));
        let mut session = Session::new("s3");

        let outcome = execute(
            &mut session,
            "use a ghost tool".to_string(),
            provider.clone(),
            empty_executor(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.iterations, 2);

        let second_call = provider.messages_at_call(1);
        let tool_message = second_call
            .iter()
            .find(|m| matches!(m.role, Role::Tool))
            .unwrap();
        assert!(tool_message.content.contains("not found"));
        assert!(tool_message.content.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn iteration_bound_yields_max_iterations_outcome() {
        let provider = Arc::new(
            ScriptedProvider::with_completions(vec![tool_call_response("file_read", "{}")])
                .repeating(),
        );
        let mut session = Session::new("s4");

        let outcome = execute(
            &mut session,
            "never stop".to_string(),
            provider.clone(),
            executor_with_file_read(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.iterations, 10);
        assert_eq!(provider.calls(), 10, "the eleventh call must never happen");
        assert_eq!(outcome.finish_reason.as_deref(), Some("max_iterations"));
        assert_eq!(outcome.content.as_deref(), Some(MAX_ITERATIONS_MESSAGE));
        assert_eq!(outcome.usage, TokenUsage::default());
    }

    #[tokio::test]
    async fn inline_reasoning_is_extracted_when_provider_omits_it() {
        let provider = Arc::new(ScriptedProvider::with_completions(vec![content_response(
            "<think>the user asked about 2+2</think>The answer is 4.",
            "stop",
        )]));
        let mut session = Session::new("s5");

        let outcome = execute(
            &mut session,
            "what is 2+2?".to_string(),
            provider,
            empty_executor(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.reasoning.as_deref(), Some("the user asked about 2+2"));
        assert_eq!(outcome.content.as_deref(), Some("The answer is 4."));
    }

    #[tokio::test]
    async fn native_reasoning_is_left_untouched() {
        let mut response = content_response("<think>looks like markup</think>ok", "stop");
        response.reasoning = Some("native reasoning".to_string());
        let provider = Arc::new(ScriptedProvider::with_completions(vec![response]));
        let mut session = Session::new("s6");

        let outcome = execute(&mut session, "hi".to_string(), provider, empty_executor())
            .await
            .unwrap();

        assert_eq!(outcome.reasoning.as_deref(), Some("native reasoning"));
        // Content is not rewritten when reasoning came natively
        assert!(outcome.content.unwrap().contains("<think>"));
    }

    #[tokio::test]
    async fn provider_fault_aborts_the_turn() {
        let provider = Arc::new(ScriptedProvider::with_completions(vec![]));
        let mut session = Session::new("s7");

        let result = execute(&mut session, "hi".to_string(), provider, empty_executor()).await;

        assert!(matches!(result, Err(AgentError::Llm(_))));
    }

    // --- Streaming ---

    #[tokio::test]
    async fn streamed_reasoning_then_content_produces_spec_event_sequence() {
        let provider = Arc::new(ScriptedProvider::with_streams(vec![vec![
            Ok(LLMChunk::Reasoning("Let ".to_string())),
            Ok(LLMChunk::Reasoning("me ".to_string())),
            Ok(LLMChunk::Reasoning("think".to_string())),
            Ok(LLMChunk::Token("Hello".to_string())),
            Ok(LLMChunk::Done {
                finish_reason: Some("stop".to_string()),
            }),
        ]]));
        let (event_tx, mut event_rx) = mpsc::channel(32);
        let mut session = Session::new("s8");

        run_agent_loop(
            &mut session,
            "hi".to_string(),
            event_tx,
            provider,
            empty_executor(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let events = collect_events(&mut event_rx).await;

        match &events[..] {
            [AgentEvent::ReasoningStart, AgentEvent::Reasoning { content: a }, AgentEvent::Reasoning { content: b }, AgentEvent::Reasoning { content: c }, AgentEvent::ReasoningEnd { reasoning }, AgentEvent::Token { content }, AgentEvent::Complete { .. }] =>
            {
                assert_eq!(a, "Let ");
                assert_eq!(b, "me ");
                assert_eq!(c, "think");
                assert_eq!(reasoning, "Let me think");
                assert_eq!(content, "Hello");
            }
            other => panic!("unexpected event sequence: {other:?}"),
        }

        let assistant = session.messages.last().unwrap();
        assert_eq!(assistant.content, "Hello");
        assert_eq!(assistant.reasoning.as_deref(), Some("Let me think"));
    }

    #[tokio::test]
    async fn streamed_tool_call_dispatches_and_continues_transparently() {
        let provider = Arc::new(ScriptedProvider::with_streams(vec![
            tool_call_stream("file_read", r#"{"file_path": "/tmp/a.txt"}"#),
            vec![
                Ok(LLMChunk::Token("Done reading.".to_string())),
                Ok(LLMChunk::Done {
                    finish_reason: Some("stop".to_string()),
                }),
            ],
        ]));
        let (event_tx, mut event_rx) = mpsc::channel(32);
        let mut session = Session::new("s9");

        run_agent_loop(
            &mut session,
            "read the file".to_string(),
            event_tx,
            provider.clone(),
            executor_with_file_read(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let events = collect_events(&mut event_rx).await;

        let kinds: Vec<&'static str> = events
            .iter()
            .map(|e| match e {
                AgentEvent::ToolCall { .. } => "tool_call",
                AgentEvent::ToolResult { .. } => "tool_result",
                AgentEvent::Token { .. } => "token",
                AgentEvent::Complete { .. } => "complete",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["tool_call", "tool_result", "token", "complete"]);

        match &events[1] {
            AgentEvent::ToolResult {
                tool_call_id,
                tool_name,
                result,
            } => {
                assert_eq!(tool_call_id, "call_1");
                assert_eq!(tool_name, "file_read");
                assert!(result.success);
            }
            other => panic!("expected tool result, got {other:?}"),
        }

        // The second provider call saw the appended assistant/tool messages
        let second_call = provider.messages_at_call(1);
        assert!(second_call.iter().any(|m| matches!(m.role, Role::Tool)));
    }

    #[tokio::test]
    async fn streamed_dispatch_failure_is_inline_and_turn_continues() {
        let provider = Arc::new(ScriptedProvider::with_streams(vec![
            tool_call_stream("no_such_tool", "{}"),
            vec![
                Ok(LLMChunk::Token("Recovered.".to_string())),
                Ok(LLMChunk::Done {
                    finish_reason: Some("stop".to_string()),
                }),
            ],
        ]));
        let (event_tx, mut event_rx) = mpsc::channel(32);
        let mut session = Session::new("s10");

        run_agent_loop(
            &mut session,
            "try it".to_string(),
            event_tx,
            provider,
            empty_executor(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let events = collect_events(&mut event_rx).await;

        let inline_error = events
            .iter()
            .any(|e| matches!(e, AgentEvent::Error { message } if message.contains("no_such_tool")));
        assert!(inline_error, "dispatch failure must surface inline");

        let failed_result = events.iter().any(|e| {
            matches!(e, AgentEvent::ToolResult { result, .. } if !result.success)
        });
        assert!(failed_result);

        assert!(
            matches!(events.last().unwrap(), AgentEvent::Complete { .. }),
            "the turn must still complete: {events:?}"
        );
    }

    #[tokio::test]
    async fn streamed_iteration_bound_ends_with_error_frame() {
        let provider = Arc::new(
            ScriptedProvider::with_streams(vec![tool_call_stream("file_read", "{}")]).repeating(),
        );
        let (event_tx, mut event_rx) = mpsc::channel(256);
        let mut session = Session::new("s11");

        run_agent_loop(
            &mut session,
            "never stop".to_string(),
            event_tx,
            provider.clone(),
            executor_with_file_read(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 10, "terminates at iteration 10, not 11");

        let events = collect_events(&mut event_rx).await;
        match events.last().unwrap() {
            AgentEvent::Error { message } => assert_eq!(message, MAX_ITERATIONS_MESSAGE),
            other => panic!("expected terminal error frame, got {other:?}"),
        }
        assert!(
            !events.iter().any(|e| matches!(e, AgentEvent::Complete { .. })),
            "no completion frame on a bounded-out turn"
        );
    }

    #[tokio::test]
    async fn provider_stream_fault_ends_stream_with_single_error() {
        let provider = Arc::new(ScriptedProvider::with_streams(vec![vec![
            Ok(LLMChunk::Token("part".to_string())),
            Err(LLMError::Api("boom".to_string())),
        ]]));
        let (event_tx, mut event_rx) = mpsc::channel(32);
        let mut session = Session::new("s12");

        let result = run_agent_loop(
            &mut session,
            "hi".to_string(),
            event_tx,
            provider,
            empty_executor(),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(AgentError::Llm(_))));

        let events = collect_events(&mut event_rx).await;
        let error_count = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::Error { .. }))
            .count();
        assert_eq!(error_count, 1);
        assert!(matches!(events.last().unwrap(), AgentEvent::Error { .. }));
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let provider = Arc::new(
            ScriptedProvider::with_streams(vec![tool_call_stream("file_read", "{}")]).repeating(),
        );
        let (event_tx, _event_rx) = mpsc::channel(256);
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        let mut session = Session::new("s13");

        let result = run_agent_loop(
            &mut session,
            "hi".to_string(),
            event_tx,
            provider.clone(),
            executor_with_file_read(),
            cancel_token,
        )
        .await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert_eq!(provider.calls(), 0);
    }

    // --- Registry / session scoping ---

    #[tokio::test]
    async fn failed_external_server_load_keeps_builtin_tools_usable() {
        use agent_mcp::{McpServerConfig, McpServerManager, McpToolExecutor, TransportConfig};

        let builtin = Arc::new(BuiltinToolExecutor::new());
        let builtin_count = builtin.list_tools().len();
        assert!(builtin_count > 0);

        let manager = Arc::new(McpServerManager::new());
        manager
            .start_all(&[McpServerConfig::new(
                "broken",
                TransportConfig::Stdio(agent_mcp::StdioConfig {
                    command: "/nonexistent/mcp-server".to_string(),
                    args: Vec::new(),
                    cwd: None,
                    env: Default::default(),
                }),
            )])
            .await;

        let composite = CompositeToolExecutor::new(
            builtin.clone(),
            Arc::new(McpToolExecutor::new(manager)),
        );

        let tools = composite.list_tools();
        assert_eq!(tools.len(), builtin_count);
        assert!(tools.iter().any(|t| t.function.name == "file_read"));
    }
}
