//! Construction options
//!
//! Options are fixed when the root node is created and shared, unchanged, by
//! every node of the tree. They can be built in code or loaded from a JSON or
//! YAML file so several suites agree on the same meta-key.

use crate::key::Key;
use crate::result::{MockError, MockResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default name of the reserved introspection member
pub const DEFAULT_META_KEY: &str = "mock";

/// Calling context used by [`MockNode::call`](crate::MockNode::call)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeBinding {
    /// A node read from a parent calls with that parent as scope,
    /// like `parent.member(..)`
    #[default]
    Parent,
    /// Calls without an explicit scope use undefined,
    /// like calling a function detached from its object
    Detached,
}

/// Options for [`create_mock_with`](crate::create_mock_with)
///
/// # Shadowing
///
/// The meta-key is reserved at every node of the tree. A data member with the
/// same name can still be written, but reading it always yields the
/// introspection API. Pick a meta-key the code under test never uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockOptions {
    /// Reserved member name that reaches the introspection API.
    /// Empty means [`DEFAULT_META_KEY`].
    pub meta_key: String,
    /// Calling context for calls without an explicit scope
    pub scope_binding: ScopeBinding,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            meta_key: DEFAULT_META_KEY.to_string(),
            scope_binding: ScopeBinding::default(),
        }
    }
}

impl MockOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the meta-key
    #[must_use]
    pub fn with_meta_key(mut self, meta_key: impl Into<String>) -> Self {
        self.meta_key = meta_key.into();
        self
    }

    /// Set the scope binding
    #[must_use]
    pub const fn with_scope_binding(mut self, binding: ScopeBinding) -> Self {
        self.scope_binding = binding;
        self
    }

    /// Effective meta-key as a member key
    #[must_use]
    pub fn meta_key(&self) -> Key {
        if self.meta_key.is_empty() {
            Key::from(DEFAULT_META_KEY)
        } else {
            Key::from(self.meta_key.as_str())
        }
    }

    /// Parse options from JSON
    pub fn from_json_str(json: &str) -> MockResult<Self> {
        let options = serde_json::from_str(json)?;
        tracing::debug!(?options, "loaded mock options from json");
        Ok(options)
    }

    /// Parse options from YAML
    pub fn from_yaml_str(yaml: &str) -> MockResult<Self> {
        let options = serde_yaml_ng::from_str(yaml)?;
        tracing::debug!(?options, "loaded mock options from yaml");
        Ok(options)
    }

    /// Load options from a `.json`, `.yaml` or `.yml` file
    pub fn from_path(path: impl AsRef<Path>) -> MockResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let content = std::fs::read_to_string(path)?;
        match extension.as_deref() {
            Some("json") => Self::from_json_str(&content),
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Err(MockError::InvalidConfig {
                message: format!(
                    "unsupported options file '{}': expected .json, .yaml or .yml",
                    path.display()
                ),
            }),
        }
    }
}
