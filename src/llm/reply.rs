use serde_json::Value;
use tracing::warn;

use super::types::{ChatCompletionResponse, Reply, TextReply, ToolCall, ToolCallPayload};

/// Turns the first choice of a chat completion into a [`Reply`].
///
/// Returns `None` when the response carries no choices at all.
pub fn extract_reply(response: ChatCompletionResponse) -> Option<Reply> {
    let message = response.choices?.into_iter().next()?.message;

    let calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(to_tool_call)
        .collect();

    if !calls.is_empty() {
        return Some(Reply::ToolCalls(calls));
    }

    let content = message.content.unwrap_or_default();
    if content.is_empty() {
        warn!("model returned empty content");
    }

    Some(Reply::Text(TextReply {
        content,
        reasoning: message.reasoning_content.filter(|r| !r.is_empty()),
    }))
}

// Unparseable arguments are kept verbatim as a JSON string so the caller
// can report them instead of losing them here.
fn to_tool_call(payload: ToolCallPayload) -> ToolCall {
    let arguments = match payload.function.arguments {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        None => Value::Null,
    };
    ToolCall {
        name: payload.function.name,
        arguments,
    }
}
