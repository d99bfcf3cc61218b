//! Binding identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{AstAnnotation, TypeDesc};

/// The identity of a binding: a type plus an optional qualifier.
///
/// Two keys are equal when their types are structurally equal and their
/// qualifiers are equal. A type-use qualifier on the outer type is lifted
/// into [`TypeKey::qualifier`] so it compares the same as a member qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeKey {
    /// The bound type, without an outer qualifier.
    pub ty: TypeDesc,
    /// The qualifier, if any.
    pub qualifier: Option<AstAnnotation>,
}

impl TypeKey {
    /// Builds a key, preferring `member_qualifier` over a type-use qualifier.
    #[must_use]
    pub fn new(mut ty: TypeDesc, member_qualifier: Option<AstAnnotation>) -> Self {
        let type_qualifier = ty.qualifier.take().map(|q| *q);
        Self {
            qualifier: member_qualifier.or(type_qualifier),
            ty,
        }
    }

    /// An unqualified key.
    #[must_use]
    pub fn of(ty: TypeDesc) -> Self {
        Self::new(ty, None)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{qualifier} {}", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}
