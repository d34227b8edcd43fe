//! Tools shipped with the crate.

use std::fmt;
use std::sync::Arc;

use agent_primitives::TypeName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::{ToolOutput, downcast_receiver, tool_target};
use crate::method::{MethodParameter, ReturnType, ToolDeclaration, ToolHost, ToolMethod};
use crate::schema::{ParameterAnnotation, SemanticType};

/// One hit returned by a [`WebSearchEngine`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchResult {
    /// Page title.
    pub title: String,
    /// Page address.
    pub url: String,
    /// Short excerpt shown by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Full page content, when the engine fetched it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl WebSearchResult {
    fn render(&self) -> String {
        match (&self.content, &self.snippet) {
            (Some(content), _) => {
                format!("Title: {}\nSource: {}\nContent:\n{content}", self.title, self.url)
            }
            (None, Some(snippet)) => {
                format!("Title: {}\nSource: {}\nSnippet:\n{snippet}", self.title, self.url)
            }
            (None, None) => format!("Title: {}\nSource: {}", self.title, self.url),
        }
    }
}

/// Search backend used by [`WebSearchTool`].
///
/// Types implementing this trait should advertise [`web_search_engine`] as an
/// interface in the discovery type index; otherwise the web search tool is
/// left out of the registry.
#[async_trait]
pub trait WebSearchEngine: Send + Sync {
    /// Runs a query and returns at most `max_results` hits.
    ///
    /// # Errors
    ///
    /// Returns any failure reported by the backend.
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<WebSearchResult>>;
}

/// Interface name of the [`WebSearchEngine`] capability.
#[must_use]
pub fn web_search_engine() -> TypeName {
    TypeName::of::<dyn WebSearchEngine>()
}

/// Built-in tool that exposes a [`WebSearchEngine`] to the model.
#[derive(Clone)]
pub struct WebSearchTool {
    engine: Arc<dyn WebSearchEngine>,
    max_results: usize,
}

impl fmt::Debug for WebSearchTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSearchTool")
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

impl WebSearchTool {
    /// Default number of hits passed to the model.
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    /// Wraps a search engine.
    #[must_use]
    pub fn new(engine: Arc<dyn WebSearchEngine>) -> Self {
        Self {
            engine,
            max_results: Self::DEFAULT_MAX_RESULTS,
        }
    }

    /// Caps the number of hits returned per query.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Runs a query and renders the hits as text blocks separated by blank
    /// lines.
    ///
    /// # Errors
    ///
    /// Returns any failure reported by the engine.
    pub async fn search_web(&self, query: &str) -> anyhow::Result<String> {
        let results = self.engine.search(query, self.max_results).await?;
        Ok(results
            .iter()
            .take(self.max_results)
            .map(WebSearchResult::render)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

impl ToolHost for WebSearchTool {
    fn tool_methods() -> Vec<ToolMethod> {
        let search = tool_target(|receiver, args| {
            let tool = downcast_receiver::<WebSearchTool>(receiver)?;
            let query: String =
                serde_json::from_value(args.into_iter().next().unwrap_or_default())?;
            Ok(ToolOutput::pending(async move {
                Ok(Value::String(tool.search_web(&query).await?))
            }))
        });

        vec![
            ToolMethod::new(Self::type_info(), "search_web", search)
                .with_description_line(
                    "This tool can be used to perform web searches using search engines, \
                     particularly when seeking information about recent events.",
                )
                .with_parameter(
                    MethodParameter::new("query", SemanticType::Text)
                        .with_annotation(
                            ParameterAnnotation::new().with_description("Web search query"),
                        ),
                )
                .with_return_type(ReturnType::Future),
        ]
    }
}

inventory::submit! {
    ToolDeclaration::new(WebSearchTool::type_info, WebSearchTool::tool_methods)
}
