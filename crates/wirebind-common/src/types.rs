//! Domain primitive types used across the wirebind workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A statically known declaration name, such as a framework annotation or a
/// well-known library type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    /// Package the declaration lives in. Empty for the root package.
    pub package: &'static str,
    /// Simple name, with `.` separating nested declarations.
    pub name: &'static str,
}

impl QualifiedName {
    /// Creates a qualified name.
    #[must_use]
    pub const fn new(package: &'static str, name: &'static str) -> Self {
        Self { package, name }
    }

    /// Returns true if `package` and `name` identify this declaration.
    #[must_use]
    pub fn matches(&self, package: &str, name: &str) -> bool {
        self.package == package && self.name == name
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational output that does not fail generation.
    Warning,
    /// A problem that fails generation of the affected component.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}
