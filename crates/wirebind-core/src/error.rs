//! Resolution errors.
//!
//! Every variant carries its fully rendered message, including the
//! resolution trace (most recent frame first) when one applies.

use thiserror::Error;

use crate::ast::AstElement;
use crate::type_key::TypeKey;

/// Why a binding could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nothing binds the requested key.
    #[error("{message}")]
    NotFound {
        /// The unresolvable key.
        key: TypeKey,
        /// Rendered message and trace.
        message: String,
    },

    /// A construction cycle with no deferral point.
    #[error("{message}")]
    Cycle {
        /// Rendered message and trace.
        message: String,
        /// Element that closed the cycle.
        element: Option<AstElement>,
    },

    /// More than one generic binding matches the key.
    #[error("{message}")]
    Ambiguous {
        /// The ambiguous key.
        key: TypeKey,
        /// Trace renderings of the matching candidates.
        candidates: Vec<String>,
        /// Rendered message and trace.
        message: String,
    },

    /// A scoped class has no component owning its scope.
    #[error("{message}")]
    ScopeNotFound {
        /// Rendered message and trace.
        message: String,
        /// The scoped class.
        element: Option<AstElement>,
    },

    /// The requested type itself failed to resolve in the front-end.
    #[error("{message}")]
    Unresolved {
        /// The unresolved key.
        key: TypeKey,
        /// Rendered message.
        message: String,
    },

    /// Any other failure anchored to a declaration.
    #[error("{message}")]
    Failed {
        /// Rendered message.
        message: String,
        /// Element the failure points at.
        element: Option<AstElement>,
    },
}

impl ResolveError {
    /// The element the error should be reported against.
    pub const fn element(&self) -> Option<AstElement> {
        match self {
            Self::Cycle { element, .. }
            | Self::ScopeNotFound { element, .. }
            | Self::Failed { element, .. } => *element,
            Self::NotFound { .. } | Self::Ambiguous { .. } | Self::Unresolved { .. } => None,
        }
    }
}

/// Convenience alias for resolution results.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Appends a trace below a message.
pub(crate) fn with_trace(message: impl Into<String>, trace: &str) -> String {
    let mut message = message.into();
    if !trace.is_empty() {
        message.push('\n');
        message.push_str(trace);
    }
    message
}
