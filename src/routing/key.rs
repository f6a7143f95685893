//! Named path parameter descriptor.

use serde::Serialize;

/// A `:name` token found while compiling a path spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedKey {
    name: String,
    optional: bool,
}

impl NamedKey {
    pub fn new(name: impl Into<String>, optional: bool) -> Self {
        Self {
            name: name.into(),
            optional,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for `:name?` tokens.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}
