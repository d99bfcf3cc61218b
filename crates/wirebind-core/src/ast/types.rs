//! Structural type descriptors.
//!
//! A [`TypeDesc`] is computed once at the front-end boundary and compared
//! structurally from then on, so two descriptors built independently for the
//! same source type are equal and hash alike.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use wirebind_common::constants::{FUNCTION_PACKAGE, LAZY, MAP, PAIR, PRELUDE_PACKAGES, SET, UNIT};
use wirebind_common::types::QualifiedName;

use super::AstAnnotation;

/// Type parameter bindings, keyed by parameter name.
pub type Substitution = FxHashMap<String, TypeDesc>;

/// Shape of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// A class, interface or object type.
    Declared,
    /// A function type; the last argument is the return type.
    Function,
    /// A reference to a type parameter, named by `name`.
    Parameter,
    /// A type the front-end failed to resolve.
    Error,
}

/// A structural description of a source type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDesc {
    /// Shape of the type.
    pub kind: TypeKind,
    /// Declaring package; empty for the root package and type parameters.
    pub package: String,
    /// Simple name, with `.` separating nested declarations.
    pub name: String,
    /// Type arguments in declaration order.
    pub args: Vec<TypeDesc>,
    /// Whether the type admits null.
    pub nullable: bool,
    /// Type-use qualifier annotation, if the front-end found one.
    pub qualifier: Option<Box<AstAnnotation>>,
    /// Target type when this descriptor names a type alias.
    pub alias_of: Option<Box<TypeDesc>>,
}

impl TypeDesc {
    /// A declared (class) type without arguments.
    #[must_use]
    pub fn declared(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Declared,
            package: package.into(),
            name: name.into(),
            args: Vec::new(),
            nullable: false,
            qualifier: None,
            alias_of: None,
        }
    }

    /// A well-known declared type.
    #[must_use]
    pub fn named(name: QualifiedName) -> Self {
        Self::declared(name.package, name.name)
    }

    /// A function type taking `params` and returning `ret`.
    #[must_use]
    pub fn function(params: Vec<Self>, ret: Self) -> Self {
        let mut args = params;
        let name = format!("Function{}", args.len());
        args.push(ret);
        Self {
            kind: TypeKind::Function,
            args,
            ..Self::declared(FUNCTION_PACKAGE, name)
        }
    }

    /// A reference to the type parameter `name`.
    #[must_use]
    pub fn parameter(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Parameter,
            ..Self::declared("", name)
        }
    }

    /// A type the front-end could not resolve.
    #[must_use]
    pub fn error(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Error,
            ..Self::declared("", name)
        }
    }

    /// A type alias `package.name` standing for `target`.
    #[must_use]
    pub fn alias(package: impl Into<String>, name: impl Into<String>, target: Self) -> Self {
        Self {
            alias_of: Some(Box::new(target)),
            ..Self::declared(package, name)
        }
    }

    /// `Lazy<inner>`.
    #[must_use]
    pub fn lazy_of(inner: Self) -> Self {
        Self::named(LAZY).with_args(vec![inner])
    }

    /// `Set<element>`.
    #[must_use]
    pub fn set_of(element: Self) -> Self {
        Self::named(SET).with_args(vec![element])
    }

    /// `Map<key, value>`.
    #[must_use]
    pub fn map_of(key: Self, value: Self) -> Self {
        Self::named(MAP).with_args(vec![key, value])
    }

    /// `Pair<first, second>`.
    #[must_use]
    pub fn pair_of(first: Self, second: Self) -> Self {
        Self::named(PAIR).with_args(vec![first, second])
    }

    /// `Unit`.
    #[must_use]
    pub fn unit() -> Self {
        Self::named(UNIT)
    }

    /// Replaces the type arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<Self>) -> Self {
        self.args = args;
        self
    }

    /// Marks the type nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attaches a type-use qualifier.
    #[must_use]
    pub fn qualified(mut self, qualifier: AstAnnotation) -> Self {
        self.qualifier = Some(Box::new(qualifier));
        self
    }

    /// Follows type aliases to the underlying type.
    #[must_use]
    pub fn resolved(&self) -> &Self {
        let mut current = self;
        while let Some(target) = &current.alias_of {
            current = target;
        }
        current
    }

    /// Returns true if this descriptor names a type alias.
    pub const fn is_type_alias(&self) -> bool {
        self.alias_of.is_some()
    }

    /// Returns true if this is (an alias of) a function type.
    pub fn is_function(&self) -> bool {
        self.resolved().kind == TypeKind::Function
    }

    /// Returns true if this type failed to resolve.
    pub fn is_error(&self) -> bool {
        self.kind == TypeKind::Error
    }

    /// Returns true if the underlying type is the declaration `name`.
    pub fn is(&self, name: QualifiedName) -> bool {
        let resolved = self.resolved();
        resolved.kind == TypeKind::Declared && name.matches(&resolved.package, &resolved.name)
    }

    /// Returns true for `Lazy<T>`.
    pub fn is_lazy(&self) -> bool {
        self.is(LAZY) && self.resolved().args.len() == 1
    }

    /// Returns true for `Pair<A, B>`.
    pub fn is_pair(&self) -> bool {
        self.is(PAIR) && self.resolved().args.len() == 2
    }

    /// Returns true for `Unit`.
    pub fn is_unit(&self) -> bool {
        self.is(UNIT)
    }

    /// Returns true if a type parameter occurs anywhere in this type.
    pub fn mentions_type_parameters(&self) -> bool {
        self.kind == TypeKind::Parameter || self.args.iter().any(Self::mentions_type_parameters)
    }

    /// Compares two types ignoring top-level nullability and qualifier.
    pub fn same_type(&self, other: &Self) -> bool {
        let (a, b) = (self.resolved(), other.resolved());
        a.kind == b.kind && a.package == b.package && a.name == b.name && a.args == b.args
    }

    /// Removes the top-level type-use qualifier.
    #[must_use]
    pub fn without_qualifier(mut self) -> Self {
        self.qualifier = None;
        self
    }

    /// Replaces type parameter references bound in `substitution`.
    #[must_use]
    pub fn substitute(&self, substitution: &Substitution) -> Self {
        if substitution.is_empty() {
            return self.clone();
        }
        if self.kind == TypeKind::Parameter {
            if let Some(bound) = substitution.get(&self.name) {
                let mut bound = bound.clone();
                bound.nullable |= self.nullable;
                if bound.qualifier.is_none() {
                    bound.qualifier.clone_from(&self.qualifier);
                }
                return bound;
            }
        }
        let mut out = self.clone();
        out.args = self.args.iter().map(|arg| arg.substitute(substitution)).collect();
        out.alias_of = self
            .alias_of
            .as_ref()
            .map(|target| Box::new(target.substitute(substitution)));
        out
    }

    /// Matches `target` against this pattern, binding type parameters into
    /// `substitution`. A parameter already bound must match the same type.
    pub fn match_pattern(&self, target: &Self, substitution: &mut Substitution) -> bool {
        if self.kind == TypeKind::Parameter {
            if let Some(bound) = substitution.get(&self.name) {
                return bound == target;
            }
            let _ = substitution.insert(self.name.clone(), target.clone());
            return true;
        }
        let (pattern, target) = (self.resolved(), target.resolved());
        pattern.kind == target.kind
            && pattern.package == target.package
            && pattern.name == target.name
            && pattern.nullable == target.nullable
            && pattern.args.len() == target.args.len()
            && pattern
                .args
                .iter()
                .zip(&target.args)
                .all(|(p, t)| p.match_pattern(t, substitution))
    }

    /// Lower-camel variable name derived from the type, e.g. `Foo` becomes
    /// `foo`, `Outer.Inner` becomes `outer_inner` and `List<String>` becomes
    /// `listString`.
    pub fn variable_name(&self) -> String {
        let mut out = self
            .name
            .split('.')
            .map(lower_first)
            .collect::<Vec<_>>()
            .join("_");
        for arg in &self.args {
            out.push_str(&simple_name(&arg.name));
        }
        out
    }

    fn fmt_name(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() || PRELUDE_PACKAGES.contains(&self.package.as_str()) {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TypeKind::Function && self.alias_of.is_none() {
            let (ret, params) = self.args.split_last().map_or((None, &[][..]), |(r, p)| (Some(r), p));
            write!(f, "(")?;
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{param}")?;
            }
            write!(f, ") -> ")?;
            match ret {
                Some(ret) => write!(f, "{ret}")?,
                None => write!(f, "Unit")?,
            }
        } else {
            self.fmt_name(f)?;
            if !self.args.is_empty() {
                write!(f, "<")?;
                for (i, arg) in self.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")?;
            }
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

fn lower_first(part: &str) -> String {
    let mut chars = part.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string() -> TypeDesc {
        TypeDesc::declared("kotlin", "String")
    }

    #[test]
    fn independently_built_descriptors_are_equal() {
        let a = TypeDesc::declared("app", "Repo").with_args(vec![string()]);
        let b = TypeDesc::declared("app", "Repo").with_args(vec![string()]);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().nullable());
    }

    #[test]
    fn display_uses_simple_names_for_prelude() {
        let ty = TypeDesc::declared("app", "Repo").with_args(vec![string().nullable()]);
        assert_eq!(ty.to_string(), "app.Repo<String?>");
        let func = TypeDesc::function(vec![string()], TypeDesc::declared("", "Foo"));
        assert_eq!(func.to_string(), "(String) -> Foo");
    }

    #[test]
    fn aliases_resolve_to_targets() {
        let target = TypeDesc::function(vec![], TypeDesc::declared("", "Foo"));
        let alias = TypeDesc::alias("app", "FooFactory", target.clone());
        assert!(alias.is_type_alias());
        assert!(alias.is_function());
        assert_eq!(alias.resolved(), &target);
        assert_eq!(alias.to_string(), "app.FooFactory");
    }

    #[test]
    fn variable_names() {
        assert_eq!(TypeDesc::declared("", "Foo").variable_name(), "foo");
        assert_eq!(TypeDesc::declared("", "Outer.Inner").variable_name(), "outer_inner");
        let list = TypeDesc::declared("kotlin.collections", "List").with_args(vec![string()]);
        assert_eq!(list.variable_name(), "listString");
    }

    #[test]
    fn substitute_replaces_parameters() {
        let pattern = TypeDesc::declared("", "Repo").with_args(vec![TypeDesc::parameter("T")]);
        let mut substitution = Substitution::default();
        let _ = substitution.insert("T".into(), TypeDesc::declared("", "User"));
        assert_eq!(
            pattern.substitute(&substitution),
            TypeDesc::declared("", "Repo").with_args(vec![TypeDesc::declared("", "User")])
        );
    }

    #[test]
    fn match_pattern_binds_consistently() {
        let t = TypeDesc::parameter("T");
        let pattern = TypeDesc::pair_of(t.clone(), t);
        let mut substitution = Substitution::default();
        assert!(pattern.match_pattern(&TypeDesc::pair_of(string(), string()), &mut substitution));
        assert_eq!(substitution.get("T"), Some(&string()));

        let mut substitution = Substitution::default();
        let mixed = TypeDesc::pair_of(string(), TypeDesc::declared("", "Foo"));
        assert!(!pattern.match_pattern(&mixed, &mut substitution));
    }

    #[test]
    fn well_known_shapes() {
        assert!(TypeDesc::lazy_of(string()).is_lazy());
        assert!(TypeDesc::pair_of(string(), string()).is_pair());
        assert!(TypeDesc::unit().is_unit());
        assert!(!string().is_lazy());
        assert!(TypeDesc::set_of(TypeDesc::parameter("T")).mentions_type_parameters());
    }
}
