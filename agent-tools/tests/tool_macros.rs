use std::sync::Arc;

use agent_tools::{
    DispatchError, ExecutionMode, ExecutorError, Receivers, SchemaType, SessionId, ToolDiscovery,
    ToolExecutionRequest, ToolExecutor, ToolHost, ToolParam, ToolRegistry, TypeIndex, TypeInfo,
    TypeName, WebSearchEngine, WebSearchResult, WebSearchTool, tools, web_search_engine,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToolParam)]
enum TemperatureUnit {
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

struct Calculator;

#[tools]
impl Calculator {
    #[tool(description = "Adds two integers")]
    fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }

    #[tool]
    fn log(&self, message: String) {
        tracing::info!(%message, "log tool called");
    }

    #[tool(description = "Logs a message without blocking")]
    async fn log_later(&self, message: String) {
        tokio::task::yield_now().await;
        tracing::info!(%message, "log_later tool called");
    }

    #[tool(
        name = "divide",
        description = "Divides a by b.",
        description = "Fails when b is zero."
    )]
    fn checked_div(&self, a: f64, b: f64) -> anyhow::Result<f64> {
        if b == 0.0 {
            anyhow::bail!("division by zero");
        }
        Ok(a / b)
    }

    #[tool(virtual_thread)]
    fn convert(
        &self,
        celsius: f64,
        #[p(description = "Target unit", required = false)] unit: Option<TemperatureUnit>,
    ) -> f64 {
        match unit.unwrap_or(TemperatureUnit::Celsius) {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    #[tool(description = "Stores a fact for the current conversation")]
    async fn remember(&self, #[session_id] session: SessionId, fact: String) -> String {
        format!("{session}: {fact}")
    }

    #[tool]
    fn greet(&self, #[session_id] session: Option<SessionId>) -> String {
        session.map_or_else(|| "hello, stranger".to_owned(), |id| format!("hello, {id}"))
    }

    #[tool]
    fn version() -> &'static str {
        "1.0"
    }

    #[allow(dead_code)]
    fn not_a_tool(&self) {}
}

struct StaticEngine;

#[async_trait]
impl WebSearchEngine for StaticEngine {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> anyhow::Result<Vec<WebSearchResult>> {
        Ok(vec![WebSearchResult {
            title: query.to_owned(),
            url: "https://example.com".into(),
            snippet: Some("result".into()),
            content: None,
        }])
    }
}

fn registry() -> ToolRegistry {
    ToolDiscovery::new(TypeIndex::new())
        .discover_declared()
        .publish()
        .expect("declared tools publish")
}

#[test]
fn derives_enumeration_for_unit_enums() {
    let semantic = TemperatureUnit::semantic_type();
    let property = agent_tools::map_parameter(&semantic, &agent_tools::ParameterAnnotation::new());
    assert_eq!(property.enum_values().unwrap(), ["C", "F"]);
}

#[test]
fn builds_descriptors_from_declared_methods() {
    let registry = registry();
    let owner = Calculator::type_info();
    let names: Vec<_> = registry
        .lookup(owner.name().as_str())
        .iter()
        .map(|entry| entry.name())
        .collect();
    assert_eq!(
        names,
        vec!["add", "log", "log_later", "divide", "convert", "remember", "greet", "version"]
    );

    let (_, add) = registry.find("add").unwrap();
    assert_eq!(add.descriptor().description(), "Adds two integers");
    assert_eq!(add.descriptor().required().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(add.descriptor().parameter("a").unwrap().schema().kind(), SchemaType::Integer);
    assert_eq!(add.mode(), ExecutionMode::Blocking);

    let (_, divide) = registry.find("divide").unwrap();
    assert_eq!(
        divide.descriptor().description(),
        "Divides a by b.\nFails when b is zero."
    );

    let (_, convert) = registry.find("convert").unwrap();
    assert_eq!(convert.mode(), ExecutionMode::VirtualThread);
    let unit = convert.descriptor().parameter("unit").unwrap();
    assert!(!unit.is_required());
    assert_eq!(unit.schema().description(), Some("Target unit"));
    assert_eq!(unit.schema().enum_values().unwrap(), ["C", "F"]);

    let (_, log_later) = registry.find("log_later").unwrap();
    assert_eq!(log_later.mode(), ExecutionMode::NonBlocking);
    assert!(log_later.metadata().returns_void());

    let (_, remember) = registry.find("remember").unwrap();
    assert_eq!(remember.mode(), ExecutionMode::NonBlocking);
    assert!(remember.descriptor().parameter("session").is_none());
    assert_eq!(remember.metadata().session_id_position(), Some(0));
    assert!(remember.metadata().requires_session_id());

    let (_, greet) = registry.find("greet").unwrap();
    assert!(greet.descriptor().parameters().is_empty());
    assert!(!greet.metadata().requires_session_id());
}

#[test]
fn web_search_requires_an_engine() {
    assert!(registry().find("search_web").is_none());

    let engine =
        TypeInfo::concrete(TypeName::of::<StaticEngine>()).with_interface(web_search_engine());
    let index = TypeIndex::new().with_type(engine);
    let registry = ToolDiscovery::new(index)
        .discover_declared()
        .publish()
        .unwrap();
    let (owner, _) = registry.find("search_web").unwrap();
    assert_eq!(owner, WebSearchTool::type_info().name());
}

async fn call(executor: &ToolExecutor, name: &str, arguments: &str) -> String {
    call_in(executor, name, arguments, None).await
}

async fn call_in(
    executor: &ToolExecutor,
    name: &str,
    arguments: &str,
    session: Option<&SessionId>,
) -> String {
    executor
        .execute(&ToolExecutionRequest::new(name, arguments), session)
        .await
        .unwrap_or_else(|err| panic!("`{name}` failed: {err}"))
}

#[tokio::test]
async fn executes_declared_tools() {
    let engine: Arc<dyn WebSearchEngine> = Arc::new(StaticEngine);
    let receivers = Receivers::new()
        .with(Arc::new(Calculator))
        .with(Arc::new(WebSearchTool::new(engine)));
    let executor = ToolExecutor::new(registry(), receivers);
    let session = SessionId::new("session-1").unwrap();

    assert_eq!(call(&executor, "add", r#"{"a": 2, "b": 3}"#).await, "5");
    assert_eq!(call(&executor, "log", r#"{"message": "hi"}"#).await, "Success");
    assert_eq!(call(&executor, "log_later", r#"{"message": "hi"}"#).await, "Success");
    assert_eq!(call(&executor, "divide", r#"{"a": 9, "b": 3}"#).await, "3.0");
    assert_eq!(call(&executor, "convert", r#"{"celsius": 100, "unit": "F"}"#).await, "212.0");
    assert_eq!(call(&executor, "convert", r#"{"celsius": 21.5}"#).await, "21.5");
    assert_eq!(
        call_in(&executor, "remember", r#"{"fact": "likes tea"}"#, Some(&session)).await,
        "session-1: likes tea"
    );
    assert_eq!(call(&executor, "greet", "").await, "hello, stranger");
    assert_eq!(call_in(&executor, "greet", "", Some(&session)).await, "hello, session-1");
    assert_eq!(call(&executor, "version", "").await, "1.0");
}

#[tokio::test]
async fn tool_errors_reach_the_caller() {
    let executor = ToolExecutor::new(registry(), Receivers::new().with(Arc::new(Calculator)));

    let err = executor
        .execute(&ToolExecutionRequest::new("divide", r#"{"a": 1, "b": 0}"#), None)
        .await
        .unwrap_err();
    let ExecutorError::Dispatch(DispatchError::Target(source)) = err else {
        panic!("expected the tool's own error, got {err:?}");
    };
    assert_eq!(source.to_string(), "division by zero");

    let err = executor
        .execute(&ToolExecutionRequest::new("remember", r#"{"fact": "tea"}"#), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Dispatch(DispatchError::MissingArgument { name, .. }) if name == "session"
    ));

    let err = executor
        .execute(&ToolExecutionRequest::new("add", r#"{"a": "two", "b": 3}"#), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("parameter `a`"), "{err}");

    let dispatched = registry()
        .find("add")
        .unwrap()
        .1
        .dispatcher()
        .execute(Arc::new(Calculator), vec![json!(40), json!(2)])
        .await
        .unwrap();
    assert_eq!(dispatched, json!(42));
}
