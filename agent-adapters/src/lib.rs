//! Chat model adapters that carry published tools to an LLM.
//!
//! [`traits`] defines the provider-neutral conversation model. [`ollama`]
//! maps it onto the Ollama chat API, including tool offers and the tool
//! calls the model sends back.

#![warn(missing_docs, clippy::pedantic)]

pub mod ollama;
pub mod traits;

mod http_client;

pub use ollama::{OllamaAdapter, OllamaConfig};
pub use traits::{
    AdapterError, AdapterMetadata, AdapterResult, AiMessage, ChatMessage, ChatRequest, Content,
    ImageContent, ModelAdapter,
};
