//! Dotted field paths from a component to one of its parents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A path of field names, e.g. `parent.grandparent`. Empty means the
/// component itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accessor {
    components: Vec<String>,
}

impl Accessor {
    /// The empty path.
    pub const EMPTY: Self = Self {
        components: Vec::new(),
    };

    /// Parses a dotted path. The empty string is the empty path.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            components: path
                .split('.')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Returns true if the path has at least one component.
    pub fn is_not_empty(&self) -> bool {
        !self.components.is_empty()
    }

    /// The path components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Appends one field.
    #[must_use]
    pub fn plus(&self, field: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(field.into());
        Self { components }
    }

    /// Appends another path.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Self { components }
    }

    /// Expresses `other` relative to this path: the shared prefix is
    /// dropped when `self` is a prefix of `other`, otherwise `other` is
    /// returned unchanged.
    ///
    /// ```
    /// use wirebind_core::accessor::Accessor;
    ///
    /// assert_eq!(Accessor::new("a").resolve(&Accessor::new("a.b.c")), Accessor::new("b.c"));
    /// assert_eq!(Accessor::new("a").resolve(&Accessor::new("b.c")), Accessor::new("b.c"));
    /// ```
    #[must_use]
    pub fn resolve(&self, other: &Self) -> Self {
        if self.components.len() < other.components.len()
            && other.components.starts_with(&self.components)
        {
            Self {
                components: other.components[self.components.len()..].to_vec(),
            }
        } else {
            other.clone()
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))
    }
}
