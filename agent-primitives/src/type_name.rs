//! Qualified type names used to key tool owners.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 256;

/// Fully qualified name of a type that declares tools.
///
/// Names are compared verbatim; `crate::tools::Calculator` and
/// `com.acme.Calculator` are equally valid spellings.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Creates a type name after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTypeName`] if the name is empty, too long, or
    /// contains whitespace or control characters.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Returns the name of `T` as reported by [`std::any::type_name`].
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_owned())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment (`Calculator` for `tools::Calculator`).
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let tail = self.0.rsplit("::").next().unwrap_or(&self.0);
        tail.rsplit('.').next().unwrap_or(tail)
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<TypeName> for String {
    fn from(value: TypeName) -> Self {
        value.0
    }
}

impl TryFrom<&str> for TypeName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidTypeName {
            name: String::new(),
            reason: "name cannot be empty".into(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidTypeName {
            name: name.into(),
            reason: format!("name length must be <= {MAX_NAME_LEN}"),
        });
    }

    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidTypeName {
            name: name.into(),
            reason: "name cannot contain whitespace or control characters".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_rust_and_dotted_names() {
        assert!(TypeName::new("agent_tools::builtin::WebSearchTool").is_ok());
        assert!(TypeName::new("com.acme.Calculator").is_ok());
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(matches!(
            TypeName::new(""),
            Err(Error::InvalidTypeName { .. })
        ));
        assert!(matches!(
            TypeName::new("my Tools"),
            Err(Error::InvalidTypeName { .. })
        ));
        assert!(TypeName::new("x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn simple_name_strips_path() {
        assert_eq!(TypeName::new("a::b::Calc").unwrap().simple_name(), "Calc");
        assert_eq!(TypeName::new("com.acme.Calc").unwrap().simple_name(), "Calc");
        assert_eq!(TypeName::new("Calc").unwrap().simple_name(), "Calc");
    }

    #[test]
    fn of_uses_std_type_name() {
        struct Local;
        assert!(TypeName::of::<Local>().as_str().ends_with("Local"));
    }
}
