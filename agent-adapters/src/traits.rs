//! Shared chat model traits and message types.

use std::fmt;

use agent_tools::{ToolDescriptor, ToolExecutionRequest};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by model adapters.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error type shared by adapter implementations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter is misconfigured.
    #[error("adapter not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The supplied request cannot be expressed for the target model.
    #[error("invalid chat request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request could not be processed.
        reason: String,
    },

    /// Transport-level failures (network, protocol, timeouts).
    #[error("adapter transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The provider returned an error or a malformed response.
    #[error("adapter response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for response failures.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Minimal metadata describing a model adapter instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterMetadata {
    provider: &'static str,
    model: String,
}

impl AdapterMetadata {
    /// Creates metadata for the supplied provider and model identifier.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Returns the provider identifier (e.g., "ollama").
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Image attached to a user message.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageContent {
    /// Raw image bytes; encoded by the adapter.
    Raw(Bytes),
    /// Image already encoded as base64.
    Base64(String),
}

impl fmt::Debug for ImageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(bytes) => write!(f, "Raw({} bytes)", bytes.len()),
            Self::Base64(data) => write!(f, "Base64({} chars)", data.len()),
        }
    }
}

/// One part of a user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// An image.
    Image(ImageContent),
}

impl Content {
    /// Creates text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates image content from raw bytes.
    #[must_use]
    pub fn image(bytes: impl Into<Bytes>) -> Self {
        Self::Image(ImageContent::Raw(bytes.into()))
    }
}

/// Message exchanged with a chat model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatMessage {
    /// Instructions that steer the model.
    System(String),
    /// User-authored contents.
    User(Vec<Content>),
    /// Model reply, possibly requesting tool calls.
    Ai(AiMessage),
    /// Result of running a requested tool.
    ToolExecutionResult {
        /// Provider-assigned call identifier, when present.
        id: Option<String>,
        /// Name of the tool that ran.
        tool_name: String,
        /// Rendered tool output.
        text: String,
    },
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::System(text.into())
    }

    /// Creates a user message with a single text content.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(vec![Content::text(text)])
    }

    /// Creates the message reporting a tool result back to the model.
    #[must_use]
    pub fn tool_result(request: &ToolExecutionRequest, text: impl Into<String>) -> Self {
        Self::ToolExecutionResult {
            id: request.id.clone(),
            tool_name: request.name.clone(),
            text: text.into(),
        }
    }
}

/// Reply produced by a chat model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMessage {
    /// Text of the reply, possibly empty when tools are requested.
    #[serde(default)]
    pub text: String,
    /// Tool calls the model wants executed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_execution_requests: Vec<ToolExecutionRequest>,
}

impl AiMessage {
    /// Returns `true` when the model asked for at least one tool call.
    #[must_use]
    pub fn has_tool_execution_requests(&self) -> bool {
        !self.tool_execution_requests.is_empty()
    }
}

/// Request submitted to a chat model.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    messages: Vec<ChatMessage>,
    tools: Vec<ToolDescriptor>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request with the supplied messages.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] if the message list is empty.
    pub fn new(messages: Vec<ChatMessage>) -> AdapterResult<Self> {
        if messages.is_empty() {
            return Err(AdapterError::invalid_request(
                "chat request requires at least one message",
            ));
        }

        Ok(Self {
            messages,
            tools: Vec::new(),
            temperature: None,
            max_output_tokens: None,
        })
    }

    /// Offers tools to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.tools = tools.into_iter().collect();
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum output token budget.
    #[must_use]
    pub const fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Returns the conversation.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the tools offered to the model.
    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Returns the configured sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Returns the configured maximum output tokens.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }
}

/// Trait implemented by all model adapters.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Returns basic metadata describing the adapter instance.
    fn metadata(&self) -> &AdapterMetadata;

    /// Sends the conversation and returns the model's reply.
    async fn chat(&self, request: ChatRequest) -> AdapterResult<AiMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_request_messages() {
        let err = ChatRequest::new(Vec::new()).expect_err("messages required");
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn builds_request() {
        let tool = ToolDescriptor::builder("echo").build().unwrap();
        let request = ChatRequest::new(vec![ChatMessage::user("ping")])
            .unwrap()
            .with_max_output_tokens(256)
            .with_temperature(0.7)
            .with_tools([tool]);

        assert_eq!(request.messages().len(), 1);
        assert_eq!(request.max_output_tokens(), Some(256));
        assert_eq!(request.temperature(), Some(0.7));
        assert_eq!(request.tools()[0].name(), "echo");
    }

    #[test]
    fn tool_result_keeps_call_identity() {
        let request = ToolExecutionRequest::new("add", "{}").with_id("call-9");
        let message = ChatMessage::tool_result(&request, "5");
        assert_eq!(
            message,
            ChatMessage::ToolExecutionResult {
                id: Some("call-9".into()),
                tool_name: "add".into(),
                text: "5".into(),
            }
        );
    }

    #[test]
    fn image_debug_hides_payload() {
        let image = ImageContent::Raw(Bytes::from_static(b"\x89PNG"));
        assert_eq!(format!("{image:?}"), "Raw(4 bytes)");
    }
}
