use futures::StreamExt;

use super::stream::MessageStream;
use super::types::{AgentOptions, ContentBlock, Message};
use crate::error::{LlmError, Result};

/// Terminal state of one agent run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub session_id: String,
    /// Empty for error subtypes.
    pub result_text: String,
    pub subtype: String,
    pub total_cost_usd: f64,
    pub num_turns: u32,
    pub is_error: bool,
    /// Tool names in call order.
    pub tool_calls: Vec<String>,
}

/// Spawn the agent with `prompt` and drive it to its result message.
pub async fn run(prompt: impl Into<String>, opts: AgentOptions) -> Result<RunResult> {
    collect(MessageStream::spawn(prompt.into(), opts)).await
}

/// Drain `stream` up to the result message.
///
/// Tool calls are logged as they arrive. A stream that ends without a result
/// is an error.
pub(crate) async fn collect(mut stream: MessageStream) -> Result<RunResult> {
    let mut tool_calls = Vec::new();

    while let Some(msg) = stream.next().await {
        match msg? {
            Message::System(sys) => {
                tracing::debug!(session_id = %sys.session_id, "agent session started");
            }
            Message::Assistant(a) => {
                for block in &a.message.content {
                    if let ContentBlock::ToolUse { name, input, .. } = block {
                        tracing::info!(tool = %name, input = %input, "agent tool call");
                        tool_calls.push(name.clone());
                    }
                }
            }
            Message::Result(r) => {
                return Ok(RunResult {
                    session_id: r.session_id().to_string(),
                    result_text: r.result_text().unwrap_or("").to_string(),
                    subtype: r.subtype().to_string(),
                    total_cost_usd: r.total_cost_usd(),
                    num_turns: r.num_turns(),
                    is_error: r.is_error(),
                    tool_calls,
                });
            }
        }
    }

    Err(LlmError::Process(
        "stream ended without a result message".into(),
    ))
}
