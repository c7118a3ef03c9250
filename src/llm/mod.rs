//! OpenAI-compatible chat models: wire types, reply extraction, and the HTTP client.

pub(crate) mod client;
mod reply;
pub(crate) mod types;

pub use client::{ChatClient, ChatModel, LlmError};
pub use types::{ChatRequest, Message, Reply, TextReply, ToolDefinition};
#[cfg(test)]
pub use types::ToolCall;
