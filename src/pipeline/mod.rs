//! Question answering: query extraction → search → reasoning → synthesis → normalization.

pub mod error;
pub(crate) mod stages;

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm::ChatModel;
use crate::markdown;
use crate::search::{SearchProvider, SearchResult};

pub use error::{PipelineError, ValidationError};

/// Longer input is cut to this many characters before trimming.
pub const MAX_QUESTION_CHARS: usize = 500;

/// A validated, non-empty user question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let truncated: String = raw.chars().take(MAX_QUESTION_CHARS).collect();
        let trimmed = truncated.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The `query` argument of the model's `web_search` call, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ExtractingQuery,
    Searching,
    ReasoningAndWaiting,
    Synthesizing,
    Normalizing,
    Done,
    Errored,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Idle => "idle",
            Stage::ExtractingQuery => "extracting_query",
            Stage::Searching => "searching",
            Stage::ReasoningAndWaiting => "reasoning",
            Stage::Synthesizing => "synthesizing",
            Stage::Normalizing => "normalizing",
            Stage::Done => "done",
            Stage::Errored => "errored",
        })
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub query: String,
    pub results: Vec<SearchResult>,
    pub reasoning: String,
    /// The reasoning model's own answer; not used to build `answer`.
    pub draft: String,
    pub answer: String,
}

/// Stage bookkeeping for one run.
#[derive(Debug)]
pub struct Progress {
    current: Stage,
    history: Vec<Stage>,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            current: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Stage {
        self.current
    }

    #[cfg(test)]
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    fn enter(&mut self, next: Stage) {
        debug!(from = %self.current, to = %next, "pipeline stage");
        self.current = next;
        self.history.push(next);
    }

    fn fail(&mut self, err: &PipelineError) {
        warn!(stage = %err.stage(), error = %err, "pipeline aborted");
        self.enter(Stage::Errored);
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one question through the three model stages and the search provider.
///
/// Stages run strictly in order. Synthesis needs the complete reasoning trace,
/// so it is the one point where the run waits on an earlier model before it
/// can build its request.
pub struct Pipeline<'a, M, S> {
    extractor: &'a M,
    search: &'a S,
    reasoner: &'a M,
    synthesizer: &'a M,
}

impl<'a, M: ChatModel, S: SearchProvider> Pipeline<'a, M, S> {
    pub fn new(extractor: &'a M, search: &'a S, reasoner: &'a M, synthesizer: &'a M) -> Self {
        Self {
            extractor,
            search,
            reasoner,
            synthesizer,
        }
    }

    /// Validates raw user input, then runs the pipeline.
    pub async fn ask(&self, raw: &str) -> Result<Answer, PipelineError> {
        self.ask_tracked(raw, &mut Progress::new()).await
    }

    pub async fn ask_tracked(
        &self,
        raw: &str,
        progress: &mut Progress,
    ) -> Result<Answer, PipelineError> {
        let result = match Question::new(raw) {
            Ok(question) => self.drive(&question, progress).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            progress.fail(e);
        }
        result
    }

    async fn drive(
        &self,
        question: &Question,
        progress: &mut Progress,
    ) -> Result<Answer, PipelineError> {
        progress.enter(Stage::ExtractingQuery);
        let query = stages::extract_query(self.extractor, question).await?;
        info!(query = %query, "search query extracted");

        progress.enter(Stage::Searching);
        let results = self.search.search(query.as_str()).await?;
        if results.is_empty() {
            warn!(query = %query, "search returned no results");
        } else {
            info!(results = results.len(), "search complete");
        }
        let serialized = stages::serialize_results(&results);

        progress.enter(Stage::ReasoningAndWaiting);
        let reasoning = stages::reason(self.reasoner, question, &serialized).await?;
        info!(trace_chars = reasoning.trace.len(), "reasoning complete");

        progress.enter(Stage::Synthesizing);
        let raw =
            stages::synthesize(self.synthesizer, question, &serialized, &reasoning.trace).await?;

        progress.enter(Stage::Normalizing);
        let answer = markdown::normalize(&raw);

        progress.enter(Stage::Done);
        Ok(Answer {
            question: question.as_str().to_string(),
            query: query.to_string(),
            results,
            reasoning: reasoning.trace,
            draft: reasoning.draft,
            answer,
        })
    }
}
