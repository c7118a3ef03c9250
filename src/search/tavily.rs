use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SearchDepth, SearchError, SearchProvider, SearchResult};
use crate::config::{ApiKey, SearchEndpoint};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RESULTS: u8 = 5;

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u8,
    search_depth: SearchDepth,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyErrorBody {
    detail: Option<TavilyErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TavilyErrorDetail {
    Message { error: String },
    Text(String),
}

/// Tavily search API client.
#[derive(Clone)]
pub struct TavilyClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
    max_results: u8,
    depth: SearchDepth,
}

impl TavilyClient {
    pub fn new(http: Client, endpoint: &SearchEndpoint, max_results: u8, depth: SearchDepth) -> Self {
        Self {
            http,
            api_key: endpoint.api_key.clone(),
            base_url: endpoint.base_url.as_str().trim_end_matches('/').to_string(),
            max_results,
            depth,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str, max_results: u8) -> Self {
        Self {
            http,
            api_key: ApiKey::new("tvly-test"),
            base_url: base_url.to_string(),
            max_results,
            depth: SearchDepth::Advanced,
        }
    }
}

impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/search", self.base_url);
        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: self.depth,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Tavily API error");
            return Err(classify_status(status, error_message(&text)));
        }

        let text = response.text().await?;
        let body: TavilyResponse = serde_json::from_str(&text)?;
        let results: Vec<SearchResult> = body
            .results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(self.max_results as usize)
            .map(|r| SearchResult {
                url: r.url,
                content: r.content,
            })
            .collect();

        debug!(results = results.len(), depth = ?self.depth, "tavily search complete");
        Ok(results)
    }
}

fn classify_status(status: StatusCode, message: String) -> SearchError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => SearchError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SearchError::Unauthorized(message),
        _ => SearchError::Api {
            code: status.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<TavilyErrorBody>(body).ok().and_then(|b| b.detail) {
        Some(TavilyErrorDetail::Message { error }) => error,
        Some(TavilyErrorDetail::Text(text)) => text,
        None => body.chars().take(200).collect(),
    }
}
