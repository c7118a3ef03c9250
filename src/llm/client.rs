use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::reply::extract_reply;
use super::types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatRequest, Reply, ToolChoice,
};
use crate::config::{ApiKey, ModelEndpoint, is_trusted_transport};

/// Reasoning models can think for minutes; the shared client timeout is too short.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API rate limit exceeded")]
    RateLimited,

    #[error("API key rejected: {0}")]
    Unauthorized(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response contained no choices")]
    EmptyResponse,

    #[error("expected a text answer, got {0} tool call(s)")]
    UnexpectedToolCalls(usize),
}

/// A chat model that answers a message list, optionally with forced tool use.
/// Implemented by `ChatClient` for production; mock implementations used in tests.
pub trait ChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<Reply, LlmError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
/// (OpenAI itself and DeepSeek).
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl ChatClient {
    pub fn new(http: Client, endpoint: &ModelEndpoint) -> Self {
        Self {
            http,
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
            base_url: endpoint.base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            model: "test-model".to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            tools: (!request.tools.is_empty()).then_some(request.tools.as_slice()),
            tool_choice: request.forced_tool.map(ToolChoice::function),
        };

        debug_assert!(
            cfg!(test) || Url::parse(&url).is_ok_and(|u| is_trusted_transport(&u)),
            "API key must only be sent over HTTPS or to a loopback host"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatCompletionResponse>(&text)
                .ok()
                .and_then(|body| body.error)
                .map(|err| describe_api_error(&err))
                .unwrap_or_else(|| {
                    let end = text.floor_char_boundary(200);
                    format!("HTTP {status}: {}", &text[..end])
                });
            warn!(status = %status, model = %self.model, "chat API error");
            return Err(classify_status(status, message));
        }

        let text = response.text().await?;
        let body: ChatCompletionResponse = serde_json::from_str(&text)?;
        debug!(model = %self.model, "chat completion received");

        if let Some(err) = &body.error {
            let message = describe_api_error(err);
            warn!(error = %message, "chat API error in 200 response");
            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

impl ChatModel for ChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<Reply, LlmError> {
        let response = self.complete(&request).await?;
        extract_reply(response).ok_or(LlmError::EmptyResponse)
    }
}

fn classify_status(status: StatusCode, message: String) -> LlmError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized(message),
        _ => LlmError::Api {
            code: status.as_u16(),
            message,
        },
    }
}

fn describe_api_error(err: &ApiError) -> String {
    let message = err.message.as_deref().unwrap_or("Unknown error");
    match &err.kind {
        Some(kind) => format!("{message} ({kind})"),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_401_as_unauthorized() {
        let err = classify_status(StatusCode::UNAUTHORIZED, "bad key".into());
        assert!(matches!(err, LlmError::Unauthorized(ref m) if m == "bad key"));
    }

    #[test]
    fn classify_500_as_generic_api_error() {
        match classify_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()) {
            LlmError::Api { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn describe_api_error_includes_type() {
        let err = ApiError {
            message: Some("Invalid model".into()),
            kind: Some("invalid_request_error".into()),
        };
        assert_eq!(describe_api_error(&err), "Invalid model (invalid_request_error)");
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::llm::types::{Message, ToolDefinition};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn chat_returns_text_with_reasoning() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Paris.",
                        "reasoning_content": "The user asks about France."
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let reply = client
            .chat(ChatRequest::new(vec![Message::user("capital of France?")]))
            .await
            .unwrap();

        match reply {
            Reply::Text(text) => {
                assert_eq!(text.content, "Paris.");
                assert_eq!(text.reasoning.as_deref(), Some("The user asks about France."));
            }
            other => panic!("expected text, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_sends_forced_tool_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "tool_choice": {"type": "function", "function": {"name": "lookup"}},
                "tools": [{"type": "function", "function": {"name": "lookup", "strict": true}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "lookup", "arguments": "{\"query\":\"x\"}"}
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let tool = ToolDefinition::function("lookup", "Look something up", serde_json::json!({}));
        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let reply = client
            .chat(ChatRequest::new(vec![Message::user("x")]).with_forced_tool(tool))
            .await
            .unwrap();

        let Reply::ToolCalls(calls) = reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].name, "lookup");
        assert_eq!(calls[0].arguments["query"], "x");
    }

    #[tokio::test]
    async fn chat_null_tool_arguments_reach_caller() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{"function": {"name": "web_search", "arguments": null}}]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let reply = client
            .chat(ChatRequest::new(vec![Message::user("x")]))
            .await
            .unwrap();

        let Reply::ToolCalls(calls) = reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].name, "web_search");
        assert!(calls[0].arguments.is_null());
    }

    #[tokio::test]
    async fn chat_undecodable_200_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let result = client.chat(ChatRequest::new(vec![Message::user("x")])).await;
        assert!(
            matches!(result, Err(LlmError::Malformed(_))),
            "got: {result:?}"
        );
    }

    #[tokio::test]
    async fn chat_429_returns_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let result = client.chat(ChatRequest::new(vec![Message::user("x")])).await;
        assert!(matches!(result, Err(LlmError::RateLimited)));
    }

    #[tokio::test]
    async fn chat_401_with_error_body_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let result = client.chat(ChatRequest::new(vec![Message::user("x")])).await;
        match result {
            Err(LlmError::Unauthorized(message)) => {
                assert!(message.contains("Incorrect API key"), "got: {message}");
            }
            other => panic!("expected Unauthorized, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_500_with_invalid_body_returns_snippet() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let result = client.chat(ChatRequest::new(vec![Message::user("x")])).await;
        match result {
            Err(LlmError::Api { code: 500, message }) => {
                assert!(message.contains("upstream exploded"), "got: {message}");
            }
            other => panic!("expected Api(500), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_without_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let client = ChatClient::with_base_url(Client::new(), &server.uri());
        let result = client.chat(ChatRequest::new(vec![Message::user("x")])).await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }
}
