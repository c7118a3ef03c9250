use crate::llm::LlmError;
use crate::search::SearchError;

use super::Stage;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("question must not be empty")]
    Empty,
}

/// The extraction model did not answer with a usable `web_search` call.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ToolCallError {
    #[error("model returned no tool call")]
    NoToolCall,

    #[error("model called unexpected tool `{0}`")]
    UnexpectedTool(String),

    #[error("malformed tool arguments: {0}")]
    MalformedArguments(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid question: {0}")]
    Validation(#[from] ValidationError),

    #[error("query extraction failed: {0}")]
    ToolCall(#[from] ToolCallError),

    #[error("query extraction provider failed: {0}")]
    Extraction(#[source] LlmError),

    #[error("web search failed: {0}")]
    Search(#[from] SearchError),

    #[error("reasoning provider failed: {0}")]
    Reasoning(#[source] LlmError),

    #[error("synthesis provider failed: {0}")]
    Synthesis(#[source] LlmError),
}

impl PipelineError {
    /// The stage that was running when the error occurred.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Validation(_) => Stage::Idle,
            PipelineError::ToolCall(_) | PipelineError::Extraction(_) => Stage::ExtractingQuery,
            PipelineError::Search(_) => Stage::Searching,
            PipelineError::Reasoning(_) => Stage::ReasoningAndWaiting,
            PipelineError::Synthesis(_) => Stage::Synthesizing,
        }
    }
}
