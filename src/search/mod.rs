//! Web search: the provider contract and its Tavily implementation.

pub(crate) mod tavily;

use serde::{Deserialize, Serialize};

pub use tavily::{DEFAULT_MAX_RESULTS, TavilyClient};

/// One ranked hit. Provider order is meaningful and must be kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub content: String,
}

/// Provider-side effort setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    #[default]
    Advanced,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search rate limit exceeded")]
    RateLimited,

    #[error("search API key rejected: {0}")]
    Unauthorized(String),

    #[error("search API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("search network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed search response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Abstraction over a web search backend.
/// Implemented by `TavilyClient` for production; mock implementations used in tests.
pub trait SearchProvider {
    /// Returns results in ranking order. An empty list means nothing was found.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}
