//! `Ollama` adapter implementation.

use std::{fmt, time::Duration};

use agent_tools::{ToolDescriptor, ToolExecutionRequest};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hyper::Uri;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client, post_json};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AiMessage, ChatMessage, ChatRequest, Content,
    ImageContent, ModelAdapter,
};

/// Configuration for the `Ollama` adapter.
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    base_url: String,
    model: String,
    default_temperature: Option<f32>,
    timeout: Duration,
}

impl OllamaConfig {
    /// Default address of a local Ollama daemon.
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:11434/";

    /// Creates a configuration for the supplied model using default settings.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: model.into(),
            default_temperature: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Overrides the base URL of the Ollama daemon.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the default sampling temperature used when the request does not
    /// provide one explicitly.
    #[must_use]
    pub const fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the HTTP timeout for requests to the Ollama daemon.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the normalised base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// `Ollama` adapter that calls the Ollama chat API over HTTP/HTTPS.
pub struct OllamaAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OllamaAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OllamaAdapter {
    /// Constructs a new adapter from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the endpoint is invalid.
    pub fn new(config: OllamaConfig) -> AdapterResult<Self> {
        let endpoint = format!("{}api/chat", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                AdapterError::configuration(format!("invalid Ollama endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            metadata: AdapterMetadata::new("ollama", config.model),
            timeout: config.timeout,
            default_temperature: config.default_temperature,
        })
    }

    fn build_request<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> AdapterResult<OllamaChatRequest<'a>> {
        let messages = to_ollama_messages(request.messages())?;
        let tools = request.tools().iter().map(OllamaTool::function).collect();

        let temperature = request.temperature().or(self.default_temperature);
        let options = (temperature.is_some() || request.max_output_tokens().is_some()).then(|| {
            ChatOptions {
                temperature,
                max_output_tokens: request.max_output_tokens(),
            }
        });

        Ok(OllamaChatRequest {
            model: self.metadata.model(),
            stream: false,
            messages,
            tools,
            options,
        })
    }
}

#[async_trait]
impl ModelAdapter for OllamaAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn chat(&self, request: ChatRequest) -> AdapterResult<AiMessage> {
        let payload = self.build_request(&request)?;
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode Ollama request: {err}"))
        })?;
        debug!(
            model = self.metadata.model(),
            messages = payload.messages.len(),
            tools = payload.tools.len(),
            "sending Ollama chat request"
        );

        let (status, bytes) = post_json(&self.client, &self.endpoint, body, self.timeout).await?;
        if !status.is_success() {
            let reason = String::from_utf8_lossy(&bytes);
            return Err(AdapterError::response(format!("Ollama returned {status}: {reason}")));
        }

        let response: OllamaChatResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode Ollama response: {err}"))
        })?;
        response.into_ai_message()
    }
}

/// Chat roles understood by Ollama.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Model output.
    Assistant,
    /// Tool results.
    Tool,
}

/// Message in Ollama's chat wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Author of the message.
    pub role: Role,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Base64-encoded images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Tool calls requested by the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OllamaToolCall>,
    /// Tool that produced a `tool` message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl OllamaMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }
}

/// Tool call in Ollama's wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OllamaToolCall {
    /// Provider-assigned identifier, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The requested function.
    pub function: OllamaFunctionCall,
}

/// Function name and arguments of an [`OllamaToolCall`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON object.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Maps a conversation to Ollama messages.
///
/// # Errors
///
/// Returns [`AdapterError::InvalidRequest`] when a user message with images
/// does not carry exactly one text content, or when a tool call's arguments
/// are not a JSON object.
pub fn to_ollama_messages(messages: &[ChatMessage]) -> AdapterResult<Vec<OllamaMessage>> {
    messages.iter().map(to_ollama_message).collect()
}

fn to_ollama_message(message: &ChatMessage) -> AdapterResult<OllamaMessage> {
    match message {
        ChatMessage::System(text) => Ok(OllamaMessage::new(Role::System, text.as_str())),
        ChatMessage::User(contents) => user_message(contents),
        ChatMessage::Ai(ai) => {
            let mut mapped = OllamaMessage::new(Role::Assistant, ai.text.as_str());
            mapped.tool_calls = ai
                .tool_execution_requests
                .iter()
                .map(to_tool_call)
                .collect::<AdapterResult<_>>()?;
            Ok(mapped)
        }
        ChatMessage::ToolExecutionResult {
            tool_name, text, ..
        } => {
            let mut mapped = OllamaMessage::new(Role::Tool, text.as_str());
            mapped.tool_name = Some(tool_name.clone());
            Ok(mapped)
        }
    }
}

fn user_message(contents: &[Content]) -> AdapterResult<OllamaMessage> {
    let texts: Vec<&str> = contents
        .iter()
        .filter_map(|content| match content {
            Content::Text(text) => Some(text.as_str()),
            Content::Image(_) => None,
        })
        .collect();
    let images: Vec<String> = contents
        .iter()
        .filter_map(|content| match content {
            Content::Image(image) => Some(encode_image(image)),
            Content::Text(_) => None,
        })
        .collect();

    if images.is_empty() {
        return Ok(OllamaMessage::new(Role::User, texts.join("\n")));
    }

    let [text] = texts.as_slice() else {
        return Err(AdapterError::invalid_request(format!(
            "expected a single text content alongside images, got {}",
            texts.len()
        )));
    };

    let mut mapped = OllamaMessage::new(Role::User, *text);
    mapped.images = images;
    Ok(mapped)
}

fn encode_image(image: &ImageContent) -> String {
    match image {
        ImageContent::Raw(bytes) => STANDARD.encode(bytes),
        ImageContent::Base64(data) => data.clone(),
    }
}

fn to_tool_call(request: &ToolExecutionRequest) -> AdapterResult<OllamaToolCall> {
    let arguments = if request.arguments.trim().is_empty() {
        Map::new()
    } else {
        match serde_json::from_str(&request.arguments) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err(AdapterError::invalid_request(format!(
                    "arguments of tool call `{}` are not a JSON object",
                    request.name
                )));
            }
        }
    };

    Ok(OllamaToolCall {
        id: request.id.clone(),
        function: OllamaFunctionCall {
            name: request.name.clone(),
            arguments,
        },
    })
}

/// Tool offered to the model in Ollama's `{type: "function"}` shape.
#[derive(Debug, Serialize)]
pub struct OllamaTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDescriptor,
}

impl<'a> OllamaTool<'a> {
    /// Wraps a descriptor as a function tool.
    #[must_use]
    pub const fn function(descriptor: &'a ToolDescriptor) -> Self {
        Self {
            kind: "function",
            function: descriptor,
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "num_predict")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaChatResponse {
    fn into_ai_message(self) -> AdapterResult<AiMessage> {
        if let Some(error) = self.error {
            return Err(AdapterError::response(error));
        }
        let message = self
            .message
            .ok_or_else(|| AdapterError::response("Ollama response has no message"))?;

        let tool_execution_requests = message
            .tool_calls
            .into_iter()
            .map(|call| ToolExecutionRequest {
                id: call.id,
                name: call.function.name,
                arguments: Value::Object(call.function.arguments).to_string(),
            })
            .collect();

        Ok(AiMessage {
            text: message.content,
            tool_execution_requests,
        })
    }
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "Ollama base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid Ollama base URL: {err}")))?;
    Ok(base)
}
