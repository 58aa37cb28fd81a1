//! Validated tool names.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 64;

/// Unique name of a tool exposed to the agent.
///
/// Names are lowercase ASCII alphanumerics plus `-`, `_` and `.`, at most 64
/// characters long.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

impl ToolName {
    /// Creates a tool name after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolName`] if the supplied name is empty, too
    /// long, or contains unsupported characters.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Creates a tool name from a string literal.
    ///
    /// # Panics
    ///
    /// Panics if the literal is not a valid tool name. Intended for built-in
    /// catalog entries only.
    #[must_use]
    pub fn from_static(name: &'static str) -> Self {
        match validate_name(name) {
            Ok(()) => Self(name.to_owned()),
            Err(err) => panic!("invalid static tool name: {err}"),
        }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ToolName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ToolName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ToolName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ToolName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        value.0
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidToolName {
            name: String::new(),
            reason: "name cannot be empty".into(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidToolName {
            name: name.into(),
            reason: format!("name length must be <= {MAX_NAME_LEN}"),
        });
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.'))
    {
        return Err(Error::InvalidToolName {
            name: name.into(),
            reason: "name must contain lowercase alphanumeric, dash, underscore, or dot".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_kebab_case() {
        let name = ToolName::new("render-video").expect("valid");
        assert_eq!(name.as_str(), "render-video");
        assert_eq!(name.to_string(), "render-video");
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(ToolName::new("").is_err());
        assert!(ToolName::new("Render Video").is_err());
        assert!(ToolName::new("x".repeat(65)).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: ToolName = serde_json::from_str("\"search-tools\"").expect("valid");
        assert_eq!(ok.as_str(), "search-tools");

        let err = serde_json::from_str::<ToolName>("\"Search Tools\"");
        assert!(err.is_err());
    }
}
