//! Conversion between named tool-call arguments and positional slots.

use agent_primitives::SessionId;
use serde_json::{Map, Value};

use crate::descriptor::ToolDescriptor;
use crate::dispatch::{DispatchError, DispatchResult, MethodMetadata};

/// Maps model-supplied arguments onto a method's positional signature.
#[derive(Clone, Copy, Debug)]
pub struct ArgumentMapper<'a> {
    descriptor: &'a ToolDescriptor,
    metadata: &'a MethodMetadata,
}

impl<'a> ArgumentMapper<'a> {
    /// Creates a mapper for one tool.
    #[must_use]
    pub const fn new(descriptor: &'a ToolDescriptor, metadata: &'a MethodMetadata) -> Self {
        Self {
            descriptor,
            metadata,
        }
    }

    /// Builds the positional argument array.
    ///
    /// The session slot receives `session`, or `null` when the slot is
    /// optional. Missing optional parameters receive `null` and names the
    /// tool does not declare are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingArgument`] when a required parameter is
    /// absent, or when the tool needs a session and `session` is `None`.
    pub fn to_positional(
        &self,
        named: &Map<String, Value>,
        session: Option<&SessionId>,
    ) -> DispatchResult<Vec<Value>> {
        let mut slots = vec![Value::Null; self.metadata.parameter_count()];

        if let Some(position) = self.metadata.session_id_position() {
            match session {
                Some(session) => slots[position] = Value::String(session.as_str().to_owned()),
                None if self.metadata.requires_session_id() => {
                    return Err(DispatchError::MissingArgument {
                        tool: self.descriptor.name().to_owned(),
                        name: self.metadata.parameter_at(position).unwrap_or("session").to_owned(),
                    });
                }
                None => {}
            }
        }

        for parameter in self.descriptor.parameters() {
            let Some(position) = self.metadata.position_of(parameter.name()) else {
                continue;
            };
            match named.get(parameter.name()) {
                Some(value) => slots[position] = value.clone(),
                None if parameter.is_required() => {
                    return Err(DispatchError::MissingArgument {
                        tool: self.descriptor.name().to_owned(),
                        name: parameter.name().to_owned(),
                    });
                }
                None => {}
            }
        }

        Ok(slots)
    }

    /// Parses a JSON object of arguments and builds the positional array.
    ///
    /// Blank input is treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArguments`] when the text is not a JSON
    /// object, or the errors of [`ArgumentMapper::to_positional`].
    pub fn parse_positional(
        &self,
        arguments: &str,
        session: Option<&SessionId>,
    ) -> DispatchResult<Vec<Value>> {
        let named = if arguments.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(arguments) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(self.invalid(format!("expected a JSON object, got `{other}`")));
                }
                Err(err) => return Err(self.invalid(err.to_string())),
            }
        };
        self.to_positional(&named, session)
    }

    /// Names the values of a positional array, leaving out the session slot.
    #[must_use]
    pub fn to_named(&self, positional: &[Value]) -> Map<String, Value> {
        self.descriptor
            .parameters()
            .iter()
            .filter_map(|parameter| {
                let position = self.metadata.position_of(parameter.name())?;
                let value = positional.get(position)?;
                Some((parameter.name().to_owned(), value.clone()))
            })
            .collect()
    }

    fn invalid(&self, reason: String) -> DispatchError {
        DispatchError::InvalidArguments {
            tool: self.descriptor.name().to_owned(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use agent_primitives::TypeName;
    use serde_json::json;

    use crate::descriptor::DescriptorFactory;
    use crate::dispatch::{ToolOutput, tool_target};
    use crate::method::{MethodParameter, ToolMethod, TypeInfo};
    use crate::schema::{ParameterAnnotation, SemanticType};

    fn remember() -> (ToolDescriptor, MethodMetadata) {
        remember_with(ParameterAnnotation::new().session_id())
    }

    fn remember_with(session: ParameterAnnotation) -> (ToolDescriptor, MethodMetadata) {
        let method = ToolMethod::new(
            TypeInfo::concrete(TypeName::new("chat::Memory").unwrap()),
            "remember",
            tool_target(|_, _| Ok(ToolOutput::ready(Value::Null))),
        )
        .with_parameter(MethodParameter::new("fact", SemanticType::Text))
        .with_parameter(
            MethodParameter::new("session", SemanticType::Text).with_annotation(session),
        )
        .with_parameter(
            MethodParameter::new("tag", SemanticType::Text)
                .with_annotation(ParameterAnnotation::new().with_required(false)),
        );
        DescriptorFactory::new().build(&method).unwrap()
    }

    #[test]
    fn fills_positions_and_session_slot() {
        let (descriptor, metadata) = remember();
        let mapper = ArgumentMapper::new(&descriptor, &metadata);
        let session = SessionId::new("s-1").unwrap();

        let named = json!({"fact": "sky is blue", "unknown": 1});
        let slots = mapper
            .to_positional(named.as_object().unwrap(), Some(&session))
            .unwrap();

        assert_eq!(slots, vec![json!("sky is blue"), json!("s-1"), Value::Null]);
    }

    #[test]
    fn missing_required_argument_errors() {
        let (descriptor, metadata) = remember();
        let mapper = ArgumentMapper::new(&descriptor, &metadata);

        let session = SessionId::new("s-1").unwrap();

        let err = mapper.to_positional(&Map::new(), Some(&session)).unwrap_err();
        assert!(matches!(err, DispatchError::MissingArgument { name, .. } if name == "fact"));
    }

    #[test]
    fn missing_session_names_the_session_parameter() {
        let (descriptor, metadata) = remember();
        let mapper = ArgumentMapper::new(&descriptor, &metadata);

        let err = mapper.parse_positional(r#"{"fact": "x"}"#, None).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MissingArgument { tool, name } if tool == "remember" && name == "session"
        ));
    }

    #[test]
    fn optional_session_slot_stays_null() {
        let (descriptor, metadata) =
            remember_with(ParameterAnnotation::new().session_id().with_required(false));
        let mapper = ArgumentMapper::new(&descriptor, &metadata);

        let slots = mapper.parse_positional(r#"{"fact": "x"}"#, None).unwrap();
        assert_eq!(slots, vec![json!("x"), Value::Null, Value::Null]);
    }

    #[test]
    fn parses_argument_text() {
        let (descriptor, metadata) = remember();
        let mapper = ArgumentMapper::new(&descriptor, &metadata);

        let session = SessionId::new("s-1").unwrap();

        let slots = mapper
            .parse_positional(r#"{"fact": "x", "tag": "t"}"#, Some(&session))
            .unwrap();
        assert_eq!(slots, vec![json!("x"), json!("s-1"), json!("t")]);

        let err = mapper.parse_positional("[1, 2]", Some(&session)).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments { .. }));

        let err = mapper.parse_positional("{not json", Some(&session)).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments { .. }));
    }

    #[test]
    fn names_positional_values_without_session() {
        let (descriptor, metadata) = remember();
        let mapper = ArgumentMapper::new(&descriptor, &metadata);

        let named = mapper.to_named(&[json!("x"), json!("s-1"), json!("t")]);
        assert_eq!(Value::Object(named), json!({"fact": "x", "tag": "t"}));
    }
}
