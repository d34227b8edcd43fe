//! Discovery input: declared tool methods and the types that own them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use agent_primitives::TypeName;

use crate::dispatch::ToolTarget;
use crate::execution::ExecutionAnnotation;
use crate::schema::{ParameterAnnotation, SemanticType};

/// Whether a type can supply a live receiver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Instantiable type.
    #[default]
    Concrete,
    /// Partially implemented type that cannot be instantiated.
    Abstract,
    /// Pure capability contract.
    Interface,
}

/// Description of a type known to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    name: TypeName,
    kind: TypeKind,
    interfaces: Vec<TypeName>,
}

impl TypeInfo {
    /// Creates a concrete type.
    #[must_use]
    pub fn concrete(name: TypeName) -> Self {
        Self::new(name, TypeKind::Concrete)
    }

    /// Creates a type of the supplied kind.
    #[must_use]
    pub fn new(name: TypeName, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            interfaces: Vec::new(),
        }
    }

    /// Declares that this type implements the supplied capability interface.
    #[must_use]
    pub fn with_interface(mut self, interface: TypeName) -> Self {
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        self
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Returns the type kind.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns the implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[TypeName] {
        &self.interfaces
    }

    /// Returns `true` when the type can provide a receiver instance.
    #[must_use]
    pub const fn is_instantiable(&self) -> bool {
        matches!(self.kind, TypeKind::Concrete)
    }

    /// Returns `true` when this type implements `interface`.
    #[must_use]
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|name| name.as_str() == interface)
    }
}

/// Set of types visible to discovery.
#[derive(Clone, Debug, Default)]
pub struct TypeIndex {
    types: HashMap<TypeName, TypeInfo>,
}

impl TypeIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type to the index, merging interfaces of repeated entries.
    pub fn insert(&mut self, info: TypeInfo) {
        match self.types.get_mut(info.name()) {
            Some(existing) => {
                for interface in info.interfaces {
                    if !existing.interfaces.contains(&interface) {
                        existing.interfaces.push(interface);
                    }
                }
            }
            None => {
                self.types.insert(info.name.clone(), info);
            }
        }
    }

    /// Builder-style variant of [`TypeIndex::insert`].
    #[must_use]
    pub fn with_type(mut self, info: TypeInfo) -> Self {
        self.insert(info);
        self
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    /// Returns the instantiable types implementing `interface`.
    pub fn implementors_of<'a>(
        &'a self,
        interface: &'a str,
    ) -> impl Iterator<Item = &'a TypeInfo> + 'a {
        self.types
            .values()
            .filter(move |info| info.is_instantiable() && info.implements(interface))
    }

    /// Returns `true` when at least one instantiable type implements `interface`.
    #[must_use]
    pub fn has_implementor(&self, interface: &str) -> bool {
        self.implementors_of(interface).next().is_some()
    }

    /// Number of indexed types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` when no type is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Return shape of a tool method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReturnType {
    /// No value.
    #[default]
    Unit,
    /// A value produced synchronously.
    Value,
    /// A single value produced asynchronously.
    Future,
    /// A future that completes without a value.
    UnitFuture,
    /// Many values produced asynchronously.
    Stream,
}

impl ReturnType {
    /// Returns `true` for future and stream returns.
    #[must_use]
    pub const fn is_async(self) -> bool {
        matches!(self, Self::Future | Self::UnitFuture | Self::Stream)
    }

    /// Returns `true` for single-valued asynchronous returns.
    #[must_use]
    pub const fn is_future(self) -> bool {
        matches!(self, Self::Future | Self::UnitFuture)
    }

    /// Returns `true` when the method produces no value, now or later.
    #[must_use]
    pub const fn is_void(self) -> bool {
        matches!(self, Self::Unit | Self::UnitFuture)
    }
}

/// Declared parameter of a tool method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodParameter {
    name: String,
    ty: SemanticType,
    annotation: ParameterAnnotation,
}

impl MethodParameter {
    /// Creates a parameter without annotations.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty,
            annotation: ParameterAnnotation::default(),
        }
    }

    /// Attaches per-parameter declarations.
    #[must_use]
    pub fn with_annotation(mut self, annotation: ParameterAnnotation) -> Self {
        self.annotation = annotation;
        self
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the semantic type.
    #[must_use]
    pub fn ty(&self) -> &SemanticType {
        &self.ty
    }

    /// Returns the per-parameter declarations.
    #[must_use]
    pub fn annotation(&self) -> &ParameterAnnotation {
        &self.annotation
    }
}

/// A method declared as a tool, together with the callable that runs it.
#[derive(Clone)]
pub struct ToolMethod {
    owner: TypeInfo,
    method_name: String,
    tool_name: Option<String>,
    description: Vec<String>,
    parameters: Vec<MethodParameter>,
    return_type: ReturnType,
    annotations: Vec<ExecutionAnnotation>,
    target: Arc<dyn ToolTarget>,
}

impl fmt::Debug for ToolMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolMethod")
            .field("owner", &self.owner.name())
            .field("method_name", &self.method_name)
            .field("tool_name", &self.tool_name)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

impl ToolMethod {
    /// Creates a tool method returning unit with no parameters.
    #[must_use]
    pub fn new<T>(owner: TypeInfo, method_name: impl Into<String>, target: T) -> Self
    where
        T: ToolTarget + 'static,
    {
        Self {
            owner,
            method_name: method_name.into(),
            tool_name: None,
            description: Vec::new(),
            parameters: Vec::new(),
            return_type: ReturnType::Unit,
            annotations: Vec::new(),
            target: Arc::new(target),
        }
    }

    /// Sets the explicit tool name. An empty name falls back to the method name.
    #[must_use]
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Appends a description line.
    #[must_use]
    pub fn with_description_line(mut self, line: impl Into<String>) -> Self {
        self.description.push(line.into());
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: MethodParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the return shape.
    #[must_use]
    pub const fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    /// Adds a scheduling annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: ExecutionAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the owning type.
    #[must_use]
    pub fn owner(&self) -> &TypeInfo {
        &self.owner
    }

    /// Returns the method name.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns the explicit tool name, if one was declared.
    #[must_use]
    pub fn explicit_tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    /// Returns the description lines.
    #[must_use]
    pub fn description_lines(&self) -> &[String] {
        &self.description
    }

    /// Returns the declared parameters in order.
    #[must_use]
    pub fn parameters(&self) -> &[MethodParameter] {
        &self.parameters
    }

    /// Returns the return shape.
    #[must_use]
    pub const fn return_type(&self) -> ReturnType {
        self.return_type
    }

    /// Returns the scheduling annotations.
    #[must_use]
    pub fn annotations(&self) -> &[ExecutionAnnotation] {
        &self.annotations
    }

    /// Returns the callable that runs the method.
    #[must_use]
    pub fn target(&self) -> Arc<dyn ToolTarget> {
        Arc::clone(&self.target)
    }

    /// Returns `Owner.method`, used in diagnostics.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner.name(), self.method_name)
    }
}

/// Types whose tool methods are known at compile time.
///
/// Implemented by the `#[tools]` attribute; hand-written impls are fine too.
pub trait ToolHost: Send + Sync + 'static {
    /// Describes the owning type.
    #[must_use]
    fn type_info() -> TypeInfo
    where
        Self: Sized,
    {
        TypeInfo::concrete(TypeName::of::<Self>())
    }

    /// Returns the declared tool methods.
    fn tool_methods() -> Vec<ToolMethod>
    where
        Self: Sized;
}

/// Link-time registration of a [`ToolHost`].
pub struct ToolDeclaration {
    type_info: fn() -> TypeInfo,
    methods: fn() -> Vec<ToolMethod>,
}

impl ToolDeclaration {
    /// Creates a declaration from a host's accessors.
    #[must_use]
    pub const fn new(type_info: fn() -> TypeInfo, methods: fn() -> Vec<ToolMethod>) -> Self {
        Self { type_info, methods }
    }

    /// Returns the owning type.
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        (self.type_info)()
    }

    /// Returns the declared tool methods.
    #[must_use]
    pub fn methods(&self) -> Vec<ToolMethod> {
        (self.methods)()
    }
}

inventory::collect!(ToolDeclaration);

/// Returns every declaration submitted with `inventory` in the final binary.
pub fn declared_hosts() -> impl Iterator<Item = &'static ToolDeclaration> {
    inventory::iter::<ToolDeclaration>.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> TypeName {
        TypeName::new(value).unwrap()
    }

    #[test]
    fn index_finds_instantiable_implementors() {
        let engine = name("search::Engine");
        let index = TypeIndex::new()
            .with_type(
                TypeInfo::new(name("search::Base"), TypeKind::Abstract)
                    .with_interface(engine.clone()),
            )
            .with_type(TypeInfo::new(engine.clone(), TypeKind::Interface));

        assert!(!index.has_implementor(engine.as_str()));

        let bing = TypeInfo::concrete(name("search::Bing")).with_interface(engine.clone());
        let index = index.with_type(bing);
        assert!(index.has_implementor(engine.as_str()));
        assert_eq!(index.implementors_of(engine.as_str()).count(), 1);
    }

    #[test]
    fn index_merges_interfaces() {
        let mut index = TypeIndex::new();
        index.insert(TypeInfo::concrete(name("a::T")).with_interface(name("a::I")));
        index.insert(TypeInfo::concrete(name("a::T")).with_interface(name("a::J")));

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("a::T").unwrap().interfaces().len(), 2);
    }

    #[test]
    fn qualified_name_joins_owner_and_method() {
        let method = ToolMethod::new(
            TypeInfo::concrete(name("calc::Calculator")),
            "add",
            crate::dispatch::tool_target(|_, _| {
                Ok(crate::dispatch::ToolOutput::ready(serde_json::Value::Null))
            }),
        );
        assert_eq!(method.qualified_name(), "calc::Calculator.add");
        assert_eq!(method.return_type(), ReturnType::Unit);
    }
}
