//! Turns declared tool methods into a publishable registry.

use std::collections::HashMap;

use agent_primitives::TypeName;
use tracing::{debug, info, warn};

use crate::builtin::{WebSearchTool, web_search_engine};
use crate::descriptor::DescriptorFactory;
use crate::dispatch::build_dispatcher;
use crate::error::{PublishError, ToolError};
use crate::execution::{determine_execution_mode, validate_execution_model};
use crate::method::{ToolHost, ToolMethod, TypeIndex, declared_hosts};
use crate::registry::{RegistryEntry, ToolRegistry, ToolRegistryBuilder};

/// Build-phase driver for tool registration.
///
/// Owners are processed in first-seen order, methods in declaration order.
/// Per-tool problems are collected in the [`DiscoveryReport`]; the offending
/// tool is left out and discovery carries on.
#[derive(Debug)]
pub struct ToolDiscovery {
    index: TypeIndex,
    companions: Vec<(TypeName, TypeName)>,
    span_wrapping: bool,
}

impl ToolDiscovery {
    /// Creates a discovery pass over the supplied type index.
    ///
    /// The built-in [`WebSearchTool`] is only kept when the index holds an
    /// implementor of its search engine capability.
    #[must_use]
    pub fn new(index: TypeIndex) -> Self {
        Self {
            index,
            companions: vec![(WebSearchTool::type_info().name().clone(), web_search_engine())],
            span_wrapping: false,
        }
    }

    /// Wraps every dispatcher in a `tool` tracing span.
    #[must_use]
    pub const fn span_wrapping(mut self, enabled: bool) -> Self {
        self.span_wrapping = enabled;
        self
    }

    /// Keeps the tools of `owner` only when some indexed type implements
    /// `interface`.
    #[must_use]
    pub fn require_companion(mut self, owner: TypeName, interface: TypeName) -> Self {
        self.companions.push((owner, interface));
        self
    }

    /// Returns the type index used for companion checks.
    #[must_use]
    pub fn type_index(&self) -> &TypeIndex {
        &self.index
    }

    /// Runs the pipeline over every type registered with `#[tools]`.
    #[must_use]
    pub fn discover_declared(mut self) -> DiscoveryReport {
        let mut methods = Vec::new();
        for declaration in declared_hosts() {
            self.index.insert(declaration.type_info());
            methods.extend(declaration.methods());
        }
        self.discover(methods)
    }

    /// Runs the pipeline over the supplied methods.
    #[must_use]
    pub fn discover(&self, methods: impl IntoIterator<Item = ToolMethod>) -> DiscoveryReport {
        let mut factory = DescriptorFactory::new();
        let mut builder = ToolRegistryBuilder::new();
        let mut errors = Vec::new();

        for (owner, methods) in group_by_owner(methods) {
            let missing_companion = self.missing_companion(&owner);

            for method in methods {
                let qualified = method.qualified_name();
                // Gated tools still reserve their names.
                let (descriptor, metadata) = match factory.build(&method) {
                    Ok(built) => built,
                    Err(err) => {
                        warn!(method = %qualified, %err, "tool rejected");
                        errors.push(err);
                        continue;
                    }
                };
                if let Some(interface) = missing_companion {
                    debug!(
                        method = %qualified,
                        interface = %interface,
                        "skipping tool without an implementation of its companion capability"
                    );
                    continue;
                }

                let problems = validate_execution_model(
                    &qualified,
                    method.annotations(),
                    method.return_type(),
                );
                if !problems.is_empty() {
                    for err in problems {
                        warn!(method = %qualified, %err, "tool rejected");
                        errors.push(err);
                    }
                    continue;
                }

                let mode = determine_execution_mode(method.annotations(), method.return_type());
                let dispatcher = build_dispatcher(metadata, method.target())
                    .with_tool_name(descriptor.name())
                    .with_mode(mode)
                    .instrumented(self.span_wrapping);

                debug!(tool = descriptor.name(), owner = %owner, %mode, "tool discovered");
                let entry = RegistryEntry::new(descriptor, dispatcher);
                if let Err(err) = builder.register(owner.clone(), entry) {
                    warn!(method = %qualified, %err, "tool rejected");
                    errors.push(err);
                }
            }
        }

        DiscoveryReport { builder, errors }
    }

    fn missing_companion(&self, owner: &TypeName) -> Option<&TypeName> {
        self.companions
            .iter()
            .filter(|(host, _)| host == owner)
            .map(|(_, interface)| interface)
            .find(|interface| !self.index.has_implementor(interface.as_str()))
    }
}

fn group_by_owner(
    methods: impl IntoIterator<Item = ToolMethod>,
) -> Vec<(TypeName, Vec<ToolMethod>)> {
    let mut groups: Vec<(TypeName, Vec<ToolMethod>)> = Vec::new();
    let mut positions: HashMap<TypeName, usize> = HashMap::new();

    for method in methods {
        let owner = method.owner().name().clone();
        let position = *positions.entry(owner.clone()).or_insert_with(|| {
            groups.push((owner, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(method);
    }

    groups
}

/// Outcome of a discovery pass.
#[derive(Debug)]
pub struct DiscoveryReport {
    builder: ToolRegistryBuilder,
    errors: Vec<ToolError>,
}

impl DiscoveryReport {
    /// Returns every error collected, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[ToolError] {
        &self.errors
    }

    /// Returns `true` when an error prevents publication.
    #[must_use]
    pub fn has_fatal_errors(&self) -> bool {
        self.errors.iter().any(ToolError::is_fatal)
    }

    /// Number of tools that passed every check.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.builder.len()
    }

    /// Publishes the immutable registry.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] listing the fatal errors when any was
    /// collected.
    pub fn publish(self) -> Result<ToolRegistry, PublishError> {
        let skipped = self.errors.len();
        let fatal: Vec<_> = self.errors.into_iter().filter(ToolError::is_fatal).collect();
        if !fatal.is_empty() {
            return Err(PublishError { errors: fatal });
        }

        let registry = self.builder.build();
        info!(tools = registry.len(), skipped, "tool registry published");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::{Value, json};

    use crate::dispatch::{SUCCESS, ToolOutput, downcast_receiver, tool_target};
    use crate::execution::{ExecutionAnnotation, ExecutionMode};
    use crate::method::{MethodParameter, ReturnType, TypeInfo, TypeKind};
    use crate::schema::{IntegerKind, SchemaType, SemanticType};

    struct Calculator;

    fn type_name(name: &str) -> TypeName {
        TypeName::new(name).unwrap()
    }

    fn noop(owner: &str, name: &str) -> ToolMethod {
        ToolMethod::new(
            TypeInfo::concrete(type_name(owner)),
            name,
            tool_target(|_, _| Ok(ToolOutput::ready(Value::Null))),
        )
    }

    fn calculator_methods() -> Vec<ToolMethod> {
        let owner = TypeInfo::concrete(type_name("calc::Calculator"));
        let add = ToolMethod::new(
            owner.clone(),
            "add",
            tool_target(|receiver, args| {
                let _calculator = downcast_receiver::<Calculator>(receiver)?;
                let a: i64 = serde_json::from_value(args[0].clone())?;
                let b: i64 = serde_json::from_value(args[1].clone())?;
                Ok(ToolOutput::ready(json!(a + b)))
            }),
        )
        .with_parameter(MethodParameter::new("a", SemanticType::Integer(IntegerKind::I64)))
        .with_parameter(MethodParameter::new("b", SemanticType::Integer(IntegerKind::I64)))
        .with_return_type(ReturnType::Value);

        let log = ToolMethod::new(
            owner,
            "log",
            tool_target(|_, _| Ok(ToolOutput::ready(Value::Null))),
        )
        .with_parameter(MethodParameter::new("message", SemanticType::Text));

        vec![add, log]
    }

    #[tokio::test]
    async fn publishes_calculator_tools() {
        let registry = ToolDiscovery::new(TypeIndex::new())
            .discover(calculator_methods())
            .publish()
            .unwrap();

        let (owner, add) = registry.find("add").unwrap();
        assert_eq!(owner.as_str(), "calc::Calculator");
        assert_eq!(add.mode(), ExecutionMode::Blocking);
        assert_eq!(add.descriptor().required().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(add
            .descriptor()
            .parameters()
            .iter()
            .all(|parameter| parameter.schema().kind() == SchemaType::Integer));

        let sum = add
            .dispatcher()
            .execute(Arc::new(Calculator), vec![json!(2), json!(3)])
            .await
            .unwrap();
        assert_eq!(sum, json!(5));

        let (_, log) = registry.find("log").unwrap();
        let result = log
            .dispatcher()
            .execute(Arc::new(Calculator), vec![json!("hi")])
            .await
            .unwrap();
        assert_eq!(result, json!(SUCCESS));
    }

    #[test]
    fn duplicate_names_block_publication() {
        let report = ToolDiscovery::new(TypeIndex::new())
            .discover([noop("web::Google", "search"), noop("web::Bing", "search")]);

        assert!(report.has_fatal_errors());
        assert_eq!(report.tool_count(), 1);

        let err = report.publish().unwrap_err();
        assert!(matches!(
            err.errors.as_slice(),
            [ToolError::DuplicateToolName { existing_owner, owner, .. }]
                if existing_owner.as_str() == "web::Google" && owner.as_str() == "web::Bing"
        ));
    }

    #[test]
    fn invalid_tools_are_skipped_but_others_publish() {
        let stream = noop("feed::Feed", "updates").with_return_type(ReturnType::Stream);
        let pinned = noop("feed::Feed", "fetch")
            .with_return_type(ReturnType::Future)
            .with_annotation(ExecutionAnnotation::RunOnVirtualThread);
        let base = ToolMethod::new(
            TypeInfo::new(type_name("feed::Base"), TypeKind::Abstract),
            "base",
            tool_target(|_, _| Ok(ToolOutput::ready(Value::Null))),
        );
        let ok = noop("feed::Feed", "latest").with_annotation(ExecutionAnnotation::NonBlocking);

        let report = ToolDiscovery::new(TypeIndex::new()).discover([stream, pinned, base, ok]);
        assert!(!report.has_fatal_errors());
        assert!(matches!(
            report.errors(),
            [
                ToolError::UnsupportedReturnType { method: first },
                ToolError::IncompatibleExecutionModel { method: second },
                ToolError::IllegalToolDefinition { .. },
            ] if first == "feed::Feed.updates" && second == "feed::Feed.fetch"
        ));

        let registry = report.publish().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("latest").unwrap().1.mode(), ExecutionMode::NonBlocking);
    }

    #[test]
    fn owners_keep_first_seen_order() {
        let groups = group_by_owner([
            noop("z::Last", "a"),
            noop("a::First", "b"),
            noop("z::Last", "c"),
        ]);
        let owners: Vec<_> =
            groups.iter().map(|(owner, methods)| (owner.as_str(), methods.len())).collect();
        assert_eq!(owners, vec![("z::Last", 2), ("a::First", 1)]);
    }

    #[test]
    fn companion_capability_gates_tools() {
        let engine = type_name("search::Engine");
        let methods = || [noop("search::Tool", "search")];

        let report = ToolDiscovery::new(TypeIndex::new())
            .require_companion(type_name("search::Tool"), engine.clone())
            .discover(methods());
        assert_eq!(report.tool_count(), 0);
        assert!(report.errors().is_empty());

        let bing = TypeInfo::concrete(type_name("search::Bing")).with_interface(engine.clone());
        let index = TypeIndex::new().with_type(bing);
        let report = ToolDiscovery::new(index)
            .require_companion(type_name("search::Tool"), engine)
            .discover(methods());
        assert_eq!(report.tool_count(), 1);
    }

    #[test]
    fn gated_tools_still_reserve_their_names() {
        let engine = type_name("search::Engine");
        let report = ToolDiscovery::new(TypeIndex::new())
            .require_companion(type_name("search::Tool"), engine)
            .discover([noop("search::Tool", "search"), noop("app::Shop", "search")]);

        assert_eq!(report.tool_count(), 0);
        assert!(report.has_fatal_errors());
        assert!(matches!(
            &report.errors()[0],
            ToolError::DuplicateToolName { name, owner, existing_owner }
                if name == "search"
                    && owner.as_str() == "app::Shop"
                    && existing_owner.as_str() == "search::Tool"
        ));
    }

    #[test]
    fn span_wrapping_instruments_dispatchers() {
        let registry = ToolDiscovery::new(TypeIndex::new())
            .span_wrapping(true)
            .discover(calculator_methods())
            .publish()
            .unwrap();
        assert!(registry.find("add").unwrap().1.dispatcher().is_instrumented());
    }
}
