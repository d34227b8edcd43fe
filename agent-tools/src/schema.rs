//! Mapping of parameter types onto JSON-schema properties.
//!
//! Arrays carry no element schema and objects are never introspected; model
//! providers receive exactly the coarse shape produced here.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::fmt;

use agent_primitives::SessionId;
use serde::{Deserialize, Serialize};

/// Integer widths accepted by the schema mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum IntegerKind {
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    /// Arbitrary-precision integer.
    Big,
}

/// Floating-point flavours accepted by the schema mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatKind {
    /// Single precision.
    F32,
    /// Double precision.
    F64,
    /// Arbitrary-precision decimal.
    Decimal,
}

/// Semantic type of a tool parameter as reported by discovery.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SemanticType {
    /// UTF-8 text.
    Text,
    /// A single character.
    Char,
    /// Boolean flag.
    Bool,
    /// Integral number.
    Integer(IntegerKind),
    /// Floating-point or decimal number.
    Float(FloatKind),
    /// Fixed-size array.
    Array,
    /// Ordered sequence.
    List,
    /// Unordered collection of distinct values.
    Set,
    /// Enumeration with its constant names in declaration order.
    Enum {
        /// Qualified enumeration type name.
        name: String,
        /// Constant names in declaration order.
        constants: Vec<String>,
    },
    /// Any other structured value.
    Object {
        /// Qualified type name.
        name: String,
    },
}

impl SemanticType {
    /// Creates an enumeration type from its constant names.
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            name: name.into(),
            constants: constants.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an opaque object type.
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Self::Object { name: name.into() }
    }
}

/// JSON-schema primitive type names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// `string`
    String,
    /// `boolean`
    Boolean,
    /// `integer`
    Integer,
    /// `number`
    Number,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Array => "array",
            Self::Object => "object",
        })
    }
}

/// Schema of a single tool parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    kind: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    enum_values: Option<Vec<String>>,
}

impl SchemaProperty {
    /// Creates a property of the supplied type without description.
    #[must_use]
    pub const fn new(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            enum_values: None,
        }
    }

    /// Creates a string property restricted to the supplied literals.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: SchemaType::String,
            description: None,
            enum_values: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Attaches a description, replacing any previous one.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the JSON-schema type.
    #[must_use]
    pub const fn kind(&self) -> SchemaType {
        self.kind
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the allowed literals for enumeration properties.
    #[must_use]
    pub fn enum_values(&self) -> Option<&[String]> {
        self.enum_values.as_deref()
    }
}

/// Per-parameter declarations supplied alongside the semantic type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterAnnotation {
    description: Option<String>,
    required: Option<bool>,
    session_id: bool,
}

impl ParameterAnnotation {
    /// Creates an empty annotation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the explicit `required` marker.
    #[must_use]
    pub const fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Marks the parameter as the session identity carrier.
    #[must_use]
    pub const fn session_id(mut self) -> Self {
        self.session_id = true;
        self
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns `false` only when the parameter was explicitly marked optional.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    /// Returns `true` for the session identity carrier.
    #[must_use]
    pub const fn is_session_id(&self) -> bool {
        self.session_id
    }
}

/// Maps a parameter type and its annotation onto a schema property.
#[must_use]
pub fn map_parameter(ty: &SemanticType, annotation: &ParameterAnnotation) -> SchemaProperty {
    let property = match ty {
        SemanticType::Text | SemanticType::Char => SchemaProperty::new(SchemaType::String),
        SemanticType::Bool => SchemaProperty::new(SchemaType::Boolean),
        SemanticType::Integer(_) => SchemaProperty::new(SchemaType::Integer),
        SemanticType::Float(_) => SchemaProperty::new(SchemaType::Number),
        SemanticType::Array | SemanticType::List | SemanticType::Set => {
            SchemaProperty::new(SchemaType::Array)
        }
        SemanticType::Enum { constants, .. } => SchemaProperty::enumeration(constants.clone()),
        SemanticType::Object { .. } => SchemaProperty::new(SchemaType::Object),
    };

    match annotation.description() {
        Some(description) if !description.is_empty() => property.with_description(description),
        _ => property,
    }
}

/// Rust types usable as tool parameters.
///
/// Implement this for domain types passed to `#[tool]` methods, or derive it:
/// unit-only enums become enumerations, everything else an opaque object.
pub trait ToolParam {
    /// Returns the semantic type reported to the schema mapper.
    fn semantic_type() -> SemanticType;
}

macro_rules! impl_tool_param {
    ($semantic:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl ToolParam for $ty {
                fn semantic_type() -> SemanticType {
                    $semantic
                }
            }
        )+
    };
}

impl_tool_param!(SemanticType::Text => String, str, SessionId);
impl_tool_param!(SemanticType::Char => char);
impl_tool_param!(SemanticType::Bool => bool);
impl_tool_param!(SemanticType::Integer(IntegerKind::I8) => i8);
impl_tool_param!(SemanticType::Integer(IntegerKind::I16) => i16);
impl_tool_param!(SemanticType::Integer(IntegerKind::I32) => i32);
impl_tool_param!(SemanticType::Integer(IntegerKind::I64) => i64);
impl_tool_param!(SemanticType::Integer(IntegerKind::I128) => i128);
impl_tool_param!(SemanticType::Integer(IntegerKind::Isize) => isize);
impl_tool_param!(SemanticType::Integer(IntegerKind::U8) => u8);
impl_tool_param!(SemanticType::Integer(IntegerKind::U16) => u16);
impl_tool_param!(SemanticType::Integer(IntegerKind::U32) => u32);
impl_tool_param!(SemanticType::Integer(IntegerKind::U64) => u64);
impl_tool_param!(SemanticType::Integer(IntegerKind::U128) => u128);
impl_tool_param!(SemanticType::Integer(IntegerKind::Usize) => usize);
impl_tool_param!(SemanticType::Float(FloatKind::F32) => f32);
impl_tool_param!(SemanticType::Float(FloatKind::F64) => f64);
impl_tool_param!(
    SemanticType::object("serde_json::Value") => serde_json::Value,
    serde_json::Map<String, serde_json::Value>,
);

impl<T> ToolParam for Vec<T> {
    fn semantic_type() -> SemanticType {
        SemanticType::List
    }
}

impl<T> ToolParam for VecDeque<T> {
    fn semantic_type() -> SemanticType {
        SemanticType::List
    }
}

impl<T> ToolParam for LinkedList<T> {
    fn semantic_type() -> SemanticType {
        SemanticType::List
    }
}

impl<T> ToolParam for [T] {
    fn semantic_type() -> SemanticType {
        SemanticType::Array
    }
}

impl<T, const N: usize> ToolParam for [T; N] {
    fn semantic_type() -> SemanticType {
        SemanticType::Array
    }
}

impl<T, S> ToolParam for HashSet<T, S> {
    fn semantic_type() -> SemanticType {
        SemanticType::Set
    }
}

impl<T> ToolParam for BTreeSet<T> {
    fn semantic_type() -> SemanticType {
        SemanticType::Set
    }
}

impl<K, V, S> ToolParam for HashMap<K, V, S> {
    fn semantic_type() -> SemanticType {
        SemanticType::object(std::any::type_name::<Self>())
    }
}

impl<K, V> ToolParam for BTreeMap<K, V> {
    fn semantic_type() -> SemanticType {
        SemanticType::object(std::any::type_name::<Self>())
    }
}

impl<T: ToolParam + ?Sized> ToolParam for Box<T> {
    fn semantic_type() -> SemanticType {
        T::semantic_type()
    }
}

impl<T: ToolParam> ToolParam for Option<T> {
    fn semantic_type() -> SemanticType {
        T::semantic_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described(text: &str) -> ParameterAnnotation {
        ParameterAnnotation::new().with_description(text)
    }

    #[test]
    fn maps_every_semantic_type() {
        let table = [
            (SemanticType::Text, SchemaType::String),
            (SemanticType::Char, SchemaType::String),
            (SemanticType::Bool, SchemaType::Boolean),
            (SemanticType::Integer(IntegerKind::I8), SchemaType::Integer),
            (SemanticType::Integer(IntegerKind::U64), SchemaType::Integer),
            (SemanticType::Integer(IntegerKind::Big), SchemaType::Integer),
            (SemanticType::Float(FloatKind::F32), SchemaType::Number),
            (SemanticType::Float(FloatKind::Decimal), SchemaType::Number),
            (SemanticType::Array, SchemaType::Array),
            (SemanticType::List, SchemaType::Array),
            (SemanticType::Set, SchemaType::Array),
            (SemanticType::enumeration("Color", ["RED"]), SchemaType::String),
            (SemanticType::object("Point"), SchemaType::Object),
        ];

        for (ty, expected) in table {
            let plain = map_parameter(&ty, &ParameterAnnotation::new());
            assert_eq!(plain.kind(), expected, "{ty:?}");
            assert_eq!(plain.description(), None);

            let with_description = map_parameter(&ty, &described("about it"));
            assert_eq!(with_description.kind(), expected, "{ty:?}");
            assert_eq!(with_description.description(), Some("about it"));
        }
    }

    #[test]
    fn enum_values_preserve_declaration_order() {
        let ty = SemanticType::enumeration("Unit", ["CELSIUS", "FAHRENHEIT", "KELVIN"]);
        let property = map_parameter(&ty, &described("temperature unit"));

        assert_eq!(property.kind(), SchemaType::String);
        assert_eq!(
            property.enum_values().unwrap(),
            &["CELSIUS", "FAHRENHEIT", "KELVIN"]
        );
        assert_eq!(property.description(), Some("temperature unit"));
    }

    #[test]
    fn empty_description_is_not_attached() {
        let property = map_parameter(&SemanticType::Text, &described(""));
        assert_eq!(property.description(), None);
    }

    #[test]
    fn serializes_as_json_schema() {
        let property = map_parameter(
            &SemanticType::enumeration("Mode", ["FAST", "SLOW"]),
            &described("speed"),
        );
        let json = serde_json::to_value(&property).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "string", "description": "speed", "enum": ["FAST", "SLOW"]})
        );

        let plain = serde_json::to_value(SchemaProperty::new(SchemaType::Integer)).unwrap();
        assert_eq!(plain, serde_json::json!({"type": "integer"}));
    }

    #[test]
    fn rust_types_report_semantic_types() {
        assert_eq!(String::semantic_type(), SemanticType::Text);
        assert_eq!(char::semantic_type(), SemanticType::Char);
        assert_eq!(
            u16::semantic_type(),
            SemanticType::Integer(IntegerKind::U16)
        );
        assert_eq!(f64::semantic_type(), SemanticType::Float(FloatKind::F64));
        assert_eq!(<Vec<String>>::semantic_type(), SemanticType::List);
        assert_eq!(<[u8; 4]>::semantic_type(), SemanticType::Array);
        assert_eq!(<BTreeSet<i32>>::semantic_type(), SemanticType::Set);
        assert_eq!(<Option<bool>>::semantic_type(), SemanticType::Bool);
        assert!(matches!(
            <HashMap<String, i32>>::semantic_type(),
            SemanticType::Object { .. }
        ));
    }

    #[test]
    fn annotation_defaults_to_required() {
        assert!(ParameterAnnotation::new().is_required());
        assert!(!ParameterAnnotation::new().with_required(false).is_required());
        assert!(ParameterAnnotation::new().with_required(true).is_required());
    }
}
