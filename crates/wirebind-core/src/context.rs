//! Per-request resolution context.

use std::rc::Rc;

use crate::ast::{AstProvider, TypeDesc};
use crate::catalog::ComponentCatalog;
use crate::type_key::TypeKey;

/// A lambda parameter in scope while resolving a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArg {
    /// Parameter type.
    pub ty: TypeDesc,
    /// Parameter name.
    pub name: String,
}

/// Carries what is in scope for one resolution request. Derived contexts
/// are cheap copies; the catalog is shared.
#[derive(Debug, Clone)]
pub struct Context {
    /// Generated component class name.
    pub class_name: String,
    /// The requesting component's catalog.
    pub catalog: Rc<ComponentCatalog>,
    /// Lambda parameters in scope, outermost first.
    pub args: Vec<NamedArg>,
    /// Scoped key currently being unwrapped.
    pub skip_scoped: Option<TypeKey>,
}

impl Context {
    /// A root context for `catalog`.
    #[must_use]
    pub fn new(class_name: impl Into<String>, catalog: Rc<ComponentCatalog>) -> Self {
        Self {
            class_name: class_name.into(),
            catalog,
            args: Vec::new(),
            skip_scoped: None,
        }
    }

    /// This context with `key` marked as being unwrapped from its scope.
    #[must_use]
    pub fn without_scoped(&self, key: &TypeKey) -> Self {
        Self {
            skip_scoped: Some(key.clone()),
            ..self.clone()
        }
    }

    /// This context with `args` brought into scope inside the current ones.
    #[must_use]
    pub fn with_args(&self, args: impl IntoIterator<Item = NamedArg>) -> Self {
        let mut out = self.clone();
        out.args.extend(args);
        out
    }

    /// The innermost unqualified lambda parameter assignable to `key`.
    pub fn find_arg(&self, provider: &dyn AstProvider, key: &TypeKey) -> Option<&NamedArg> {
        if key.qualifier.is_some() {
            return None;
        }
        self.args
            .iter()
            .rev()
            .find(|arg| provider.is_assignable_from(&key.ty, &arg.ty))
    }

    /// Returns true if `key` is the scoped key being unwrapped.
    pub fn skips_scope_of(&self, key: &TypeKey) -> bool {
        self.skip_scoped.as_ref() == Some(key)
    }
}
