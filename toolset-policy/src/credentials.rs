//! Credential presence checks.
//!
//! The registry never sees secret values. It only asks whether a named
//! credential is available.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{PolicyError, PolicyResult};

/// Answers whether an external credential is configured.
pub trait CredentialProvider: Send + Sync + Debug {
    /// Returns `true` when `key` is available.
    fn has_credential(&self, key: &str) -> bool;
}

impl<T> CredentialProvider for Arc<T>
where
    T: CredentialProvider + ?Sized,
{
    fn has_credential(&self, key: &str) -> bool {
        (**self).has_credential(key)
    }
}

/// Fails with [`PolicyError::MissingCredential`] unless `key` is configured.
///
/// # Errors
///
/// Returns [`PolicyError::MissingCredential`] when the provider reports the
/// key as absent.
pub fn require(provider: &dyn CredentialProvider, key: &str) -> PolicyResult<()> {
    if provider.has_credential(key) {
        Ok(())
    } else {
        Err(PolicyError::MissingCredential {
            key: key.to_owned(),
        })
    }
}

/// Fixed set of available credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCredentials {
    keys: BTreeSet<String>,
}

impl StaticCredentials {
    /// Creates a provider with no credentials.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds a credential.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }
}

impl<S> FromIterator<S> for StaticCredentials
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn has_credential(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

/// Reads credential presence from environment variables.
///
/// Unmapped keys fall back to `<KEY>_API_KEY`, upper-cased with `-` and `.`
/// turned into `_`. Empty variables count as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvCredentials {
    variables: BTreeMap<String, String>,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new().with_variable("elevenlabs", "ELEVENLABS_API_KEY")
    }
}

impl EnvCredentials {
    /// Creates a provider with no explicit mappings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variables: BTreeMap::new(),
        }
    }

    /// Maps `key` to the environment variable `variable`.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, variable: impl Into<String>) -> Self {
        self.variables.insert(key.into(), variable.into());
        self
    }

    /// Returns the environment variable consulted for `key`.
    #[must_use]
    pub fn variable_for(&self, key: &str) -> String {
        self.variables.get(key).cloned().unwrap_or_else(|| {
            let stem: String = key
                .chars()
                .map(|c| match c {
                    '-' | '.' => '_',
                    other => other.to_ascii_uppercase(),
                })
                .collect();
            format!("{stem}_API_KEY")
        })
    }
}

impl CredentialProvider for EnvCredentials {
    fn has_credential(&self, key: &str) -> bool {
        std::env::var(self.variable_for(key)).is_ok_and(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_credentials_answer_membership() {
        let credentials: StaticCredentials = ["elevenlabs"].into_iter().collect();
        assert!(credentials.has_credential("elevenlabs"));
        assert!(!credentials.has_credential("openai"));
        assert!(require(&credentials, "elevenlabs").is_ok());
    }

    #[test]
    fn missing_credential_is_reported() {
        let err = require(&StaticCredentials::none(), "elevenlabs").expect_err("missing");
        assert_eq!(
            err,
            PolicyError::MissingCredential {
                key: "elevenlabs".into()
            }
        );
    }

    #[test]
    fn env_variable_names() {
        let credentials = EnvCredentials::default();
        assert_eq!(credentials.variable_for("elevenlabs"), "ELEVENLABS_API_KEY");
        assert_eq!(credentials.variable_for("stock-footage"), "STOCK_FOOTAGE_API_KEY");
    }

    #[test]
    fn unset_env_variable_is_absent() {
        let credentials =
            EnvCredentials::new().with_variable("probe", "TOOLSET_POLICY_TEST_UNSET_VARIABLE");
        assert!(!credentials.has_credential("probe"));
    }
}
