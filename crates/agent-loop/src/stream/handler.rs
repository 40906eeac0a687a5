use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agent_core::{AgentError, AgentEvent};
use agent_llm::{DecodedStream, LLMStream, StreamDecoder};

/// Drive one provider stream to completion, forwarding framed events as they
/// are decoded.
///
/// Content and reasoning frames go out incrementally; buffered tool-call
/// frames flush at stream end. A provider fault emits exactly one error
/// frame and surfaces as `AgentError::Llm`.
pub async fn consume_llm_stream(
    mut stream: LLMStream,
    event_tx: &mpsc::Sender<AgentEvent>,
    cancel_token: &CancellationToken,
) -> Result<DecodedStream, AgentError> {
    let mut decoder = StreamDecoder::new();

    while let Some(chunk_result) = stream.next().await {
        if cancel_token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        match chunk_result {
            Ok(chunk) => {
                for event in decoder.on_chunk(chunk) {
                    let _ = event_tx.send(event).await;
                }
            }
            Err(error) => {
                let message = error.to_string();
                for event in decoder.on_error(message.as_str()) {
                    let _ = event_tx.send(event).await;
                }
                return Err(AgentError::Llm(message));
            }
        }
    }

    for event in decoder.finish() {
        let _ = event_tx.send(event).await;
    }

    Ok(decoder.into_output())
}
