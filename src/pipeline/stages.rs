use serde_json::{Value, json};
use tracing::{debug, warn};

use super::error::{PipelineError, ToolCallError};
use super::{Question, SearchQuery};
use crate::llm::{ChatModel, ChatRequest, LlmError, Message, Reply, TextReply, ToolDefinition};
use crate::search::SearchResult;

pub const WEB_SEARCH: &str = "web_search";

/// Stand-in for the serialized result list when the search found nothing.
pub const NO_RESULTS: &str = "no results found";

const REASONING_INSTRUCTION: &str = "Based on the search results and your own knowledge about the question, please analyze and explain the answer.";

const SYNTHESIS_INSTRUCTION: &str = "Write the final answer to my question. Follow the guidance of the reasoning above, use the search results where they apply, and attribute every piece of information to the website it came from.";

/// Output of the reasoning model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reasoning {
    /// Private deliberation; empty when the provider returned none.
    pub trace: String,
    /// The model's own answer. Kept for diagnostics only.
    pub draft: String,
}

pub fn web_search_tool() -> ToolDefinition {
    ToolDefinition::function(
        WEB_SEARCH,
        "Search the web for current information on the given query",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to look up on the web"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    )
}

/// Asks the extraction model for a forced `web_search` call and returns its query.
pub async fn extract_query(
    model: &impl ChatModel,
    question: &Question,
) -> Result<SearchQuery, PipelineError> {
    let request = ChatRequest::new(vec![Message::user(question.as_str())])
        .with_forced_tool(web_search_tool());

    let reply = model.chat(request).await.map_err(PipelineError::Extraction)?;
    Ok(parse_search_query(reply)?)
}

pub fn parse_search_query(reply: Reply) -> Result<SearchQuery, ToolCallError> {
    let Reply::ToolCalls(calls) = reply else {
        return Err(ToolCallError::NoToolCall);
    };

    if calls.len() > 1 {
        warn!(count = calls.len(), "model returned several tool calls, using the first");
    }
    let call = calls.into_iter().next().ok_or(ToolCallError::NoToolCall)?;

    if call.name != WEB_SEARCH {
        return Err(ToolCallError::UnexpectedTool(call.name));
    }
    if !call.arguments.is_object() {
        return Err(ToolCallError::MalformedArguments(format!(
            "expected a JSON object, got {}",
            call.arguments
        )));
    }

    match call.arguments.get("query") {
        Some(Value::String(query)) if !query.trim().is_empty() => Ok(SearchQuery(query.clone())),
        Some(Value::String(_)) => Err(ToolCallError::MalformedArguments(
            "`query` is empty".to_string(),
        )),
        Some(other) => Err(ToolCallError::MalformedArguments(format!(
            "`query` must be a string, got {other}"
        ))),
        None => Err(ToolCallError::MalformedArguments(
            "missing `query`".to_string(),
        )),
    }
}

/// Renders results as a JSON array in ranking order, or [`NO_RESULTS`].
pub fn serialize_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    Value::Array(
        results
            .iter()
            .map(|r| json!({ "url": r.url, "content": r.content }))
            .collect(),
    )
    .to_string()
}

pub async fn reason(
    model: &impl ChatModel,
    question: &Question,
    results: &str,
) -> Result<Reasoning, PipelineError> {
    let request = ChatRequest::new(vec![
        Message::user(question.as_str()),
        Message::assistant(format!("Web search results: {results}")),
        Message::user(REASONING_INSTRUCTION),
    ]);

    let reply = model.chat(request).await.and_then(expect_text);
    let TextReply { content, reasoning } = reply.map_err(PipelineError::Reasoning)?;

    if reasoning.is_none() {
        debug!("reasoning model returned no explicit trace");
    }
    Ok(Reasoning {
        trace: reasoning.unwrap_or_default(),
        draft: content,
    })
}

/// Produces the raw (still markdown) final answer.
pub async fn synthesize(
    model: &impl ChatModel,
    question: &Question,
    results: &str,
    trace: &str,
) -> Result<String, PipelineError> {
    let trace = if trace.is_empty() {
        "(no explicit reasoning trace)"
    } else {
        trace
    };
    let request = ChatRequest::new(vec![
        Message::user(question.as_str()),
        Message::assistant(format!("Web search results: {results}")),
        Message::assistant(format!("Reasoning: {trace}")),
        Message::user(SYNTHESIS_INSTRUCTION),
    ]);

    let reply = model.chat(request).await.and_then(expect_text);
    Ok(reply.map_err(PipelineError::Synthesis)?.content)
}

fn expect_text(reply: Reply) -> Result<TextReply, LlmError> {
    match reply {
        Reply::Text(text) => Ok(text),
        Reply::ToolCalls(calls) => Err(LlmError::UnexpectedToolCalls(calls.len())),
    }
}
