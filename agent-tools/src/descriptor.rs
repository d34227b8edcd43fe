//! Tool descriptors and the factory that derives them from tool methods.

use std::collections::HashMap;

use agent_primitives::TypeName;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::dispatch::MethodMetadata;
use crate::error::{ToolError, ToolResult};
use crate::method::ToolMethod;
use crate::schema::{SchemaProperty, map_parameter};

/// A named parameter inside a [`ToolDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolParameter {
    name: String,
    schema: SchemaProperty,
    required: bool,
}

impl ToolParameter {
    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter schema.
    #[must_use]
    pub fn schema(&self) -> &SchemaProperty {
        &self.schema
    }

    /// Returns `true` when the model must supply this parameter.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }
}

/// Schema-level description of a tool, independent of how it is invoked.
///
/// Serializes to the tool-calling shape shared by most model providers:
///
/// ```json
/// {"name": "add", "description": "",
///  "parameters": {"type": "object", "properties": {}, "required": []}}
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    /// Starts building a descriptor for the supplied tool name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ToolDescriptorBuilder {
        ToolDescriptorBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, possibly empty.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    /// Returns the names of required parameters in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|parameter| parameter.required)
            .map(ToolParameter::name)
    }

    /// Returns the `{type: object, properties, required}` parameter schema.
    #[must_use]
    pub fn parameters_schema(&self) -> ParametersSchema<'_> {
        ParametersSchema(&self.parameters)
    }
}

impl Serialize for ToolDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ToolDescriptor", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("parameters", &self.parameters_schema())?;
        state.end()
    }
}

/// Serializable view of a descriptor's parameters as a JSON object schema.
#[derive(Clone, Copy, Debug)]
pub struct ParametersSchema<'a>(&'a [ToolParameter]);

impl Serialize for ParametersSchema<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let required: Vec<&str> = self
            .0
            .iter()
            .filter(|parameter| parameter.required)
            .map(ToolParameter::name)
            .collect();

        let mut state = serializer.serialize_struct("Parameters", 3)?;
        state.serialize_field("type", "object")?;
        state.serialize_field("properties", &Properties(self.0))?;
        state.serialize_field("required", &required)?;
        state.end()
    }
}

struct Properties<'a>(&'a [ToolParameter]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for parameter in self.0 {
            map.serialize_entry(&parameter.name, &parameter.schema)?;
        }
        map.end()
    }
}

/// Builder for [`ToolDescriptor`].
#[derive(Debug)]
pub struct ToolDescriptorBuilder {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
}

impl ToolDescriptorBuilder {
    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a required parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDescriptor`] if the name is empty or already
    /// used by another parameter.
    pub fn add_parameter(
        self,
        name: impl Into<String>,
        schema: SchemaProperty,
    ) -> ToolResult<Self> {
        self.push(name.into(), schema, true)
    }

    /// Adds an optional parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDescriptor`] if the name is empty or already
    /// used by another parameter.
    pub fn add_optional_parameter(
        self,
        name: impl Into<String>,
        schema: SchemaProperty,
    ) -> ToolResult<Self> {
        self.push(name.into(), schema, false)
    }

    fn push(mut self, name: String, schema: SchemaProperty, required: bool) -> ToolResult<Self> {
        if name.trim().is_empty() {
            return Err(ToolError::invalid_descriptor(format!(
                "tool `{}` declares a parameter without a name",
                self.name
            )));
        }
        if self.parameters.iter().any(|parameter| parameter.name == name) {
            return Err(ToolError::invalid_descriptor(format!(
                "tool `{}` declares parameter `{name}` more than once",
                self.name
            )));
        }
        self.parameters.push(ToolParameter {
            name,
            schema,
            required,
        });
        Ok(self)
    }

    /// Finalises the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDescriptor`] if the tool name is empty.
    pub fn build(self) -> ToolResult<ToolDescriptor> {
        if self.name.trim().is_empty() {
            return Err(ToolError::invalid_descriptor("tool name cannot be empty"));
        }
        Ok(ToolDescriptor {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
        })
    }
}

/// Resolves the published tool name: the explicit name when non-empty,
/// otherwise the method name.
#[must_use]
pub fn resolve_tool_name<'a>(explicit: Option<&'a str>, method_name: &'a str) -> &'a str {
    match explicit {
        Some(name) if !name.is_empty() => name,
        _ => method_name,
    }
}

/// Joins description lines with newlines.
#[must_use]
pub fn join_description(lines: &[String]) -> String {
    lines.join("\n")
}

/// Builds descriptors for one registry, rejecting names already in use.
#[derive(Debug, Default)]
pub struct DescriptorFactory {
    built: HashMap<String, TypeName>,
}

impl DescriptorFactory {
    /// Creates a factory with no reserved names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the owner that already claimed `name`, if any.
    #[must_use]
    pub fn owner_of(&self, name: &str) -> Option<&TypeName> {
        self.built.get(name)
    }

    /// Builds the descriptor and marshalling metadata of a tool method.
    ///
    /// # Errors
    ///
    /// * [`ToolError::IllegalToolDefinition`] when the owner is abstract or an
    ///   interface, or when more than one parameter carries the session marker.
    /// * [`ToolError::DuplicateToolName`] when the name was already built.
    /// * [`ToolError::InvalidDescriptor`] when parameter names collide.
    pub fn build(&mut self, method: &ToolMethod) -> ToolResult<(ToolDescriptor, MethodMetadata)> {
        let owner = method.owner();
        if !owner.is_instantiable() {
            return Err(ToolError::IllegalToolDefinition {
                owner: owner.name().clone(),
                method: method.method_name().to_owned(),
                reason: "tools are only supported on instantiable types".into(),
            });
        }

        let name = resolve_tool_name(method.explicit_tool_name(), method.method_name());
        if let Some(existing_owner) = self.built.get(name) {
            return Err(ToolError::DuplicateToolName {
                name: name.to_owned(),
                owner: owner.name().clone(),
                existing_owner: existing_owner.clone(),
            });
        }

        let mut builder =
            ToolDescriptor::builder(name).description(join_description(method.description_lines()));
        let mut positions = HashMap::with_capacity(method.parameters().len());
        let mut session_id_position = None;
        let mut session_id_optional = false;

        for (position, parameter) in method.parameters().iter().enumerate() {
            if positions.insert(parameter.name().to_owned(), position).is_some() {
                return Err(ToolError::invalid_descriptor(format!(
                    "tool `{name}` declares parameter `{}` more than once",
                    parameter.name()
                )));
            }

            let annotation = parameter.annotation();
            if annotation.is_session_id() {
                if session_id_position.is_some() {
                    return Err(ToolError::IllegalToolDefinition {
                        owner: owner.name().clone(),
                        method: method.method_name().to_owned(),
                        reason: "only one parameter may carry the session id".into(),
                    });
                }
                session_id_position = Some(position);
                session_id_optional = !annotation.is_required();
                continue;
            }

            let schema = map_parameter(parameter.ty(), annotation);
            builder = if annotation.is_required() {
                builder.add_parameter(parameter.name(), schema)?
            } else {
                builder.add_optional_parameter(parameter.name(), schema)?
            };
        }

        let descriptor = builder.build()?;
        let mut metadata =
            MethodMetadata::new(method.return_type().is_void(), positions, session_id_position);
        if session_id_optional {
            metadata = metadata.with_optional_session_id();
        }

        debug!(
            tool = descriptor.name(),
            owner = %owner.name(),
            parameters = descriptor.parameters().len(),
            "built tool descriptor"
        );
        self.built.insert(descriptor.name().to_owned(), owner.name().clone());
        Ok((descriptor, metadata))
    }
}
