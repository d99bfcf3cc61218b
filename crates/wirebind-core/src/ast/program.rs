//! In-memory declaration model.

use rustc_hash::FxHashMap;
use wirebind_common::constants::{QUALIFIER, SCOPE};
use wirebind_common::types::QualifiedName;

use super::{
    AstAnnotation, AstClass, AstMethod, AstProvider, ClassId, ClassKind, MethodId, TypeDesc,
};

/// An owned, arena-backed set of declarations.
///
/// Front-ends lower their host AST into a `Program`; tests build one
/// directly.
#[derive(Debug, Default, Clone)]
pub struct Program {
    classes: Vec<AstClass>,
    methods: Vec<AstMethod>,
    by_name: FxHashMap<(String, String), ClassId>,
    functions: FxHashMap<(String, String), Vec<MethodId>>,
}

impl Program {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class declaration. A later class with the same qualified name
    /// shadows an earlier one for lookups.
    pub fn add_class(&mut self, class: AstClass) -> ClassId {
        let id = ClassId(index_u32(self.classes.len()));
        let _ = self
            .by_name
            .insert((class.package.clone(), class.name.clone()), id);
        self.classes.push(class);
        id
    }

    /// Adds a member to `owner`.
    pub fn add_method(&mut self, owner: ClassId, mut method: AstMethod) -> MethodId {
        let id = MethodId(index_u32(self.methods.len()));
        method.owner = Some(owner);
        self.methods.push(method);
        if let Some(class) = self.classes.get_mut(owner.0 as usize) {
            class.methods.push(id);
        }
        id
    }

    /// Adds a top-level function.
    pub fn add_function(&mut self, mut function: AstMethod) -> MethodId {
        let id = MethodId(index_u32(self.methods.len()));
        function.owner = None;
        self.functions
            .entry((function.package.clone(), function.name.clone()))
            .or_default()
            .push(id);
        self.methods.push(function);
        id
    }

    /// Declares an annotation class carrying `meta` and returns a usage of it.
    pub fn declare_annotation(
        &mut self,
        package: &str,
        name: &str,
        meta: QualifiedName,
    ) -> AstAnnotation {
        let class = AstClass {
            kind: ClassKind::Annotation,
            ..AstClass::new(package, name)
        }
        .annotated(meta);
        let _ = self.add_class(class);
        AstAnnotation::new(package, name)
    }

    /// Declares a scope annotation.
    pub fn declare_scope(&mut self, package: &str, name: &str) -> AstAnnotation {
        self.declare_annotation(package, name, SCOPE)
    }

    /// Declares a qualifier annotation.
    pub fn declare_qualifier(&mut self, package: &str, name: &str) -> AstAnnotation {
        self.declare_annotation(package, name, QUALIFIER)
    }

    /// Mutable access to a declared class.
    pub fn class_mut(&mut self, id: ClassId) -> Option<&mut AstClass> {
        self.classes.get_mut(id.0 as usize)
    }

    /// Number of declared classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

impl AstProvider for Program {
    fn class(&self, id: ClassId) -> &AstClass {
        &self.classes[id.0 as usize]
    }

    fn method(&self, id: MethodId) -> &AstMethod {
        &self.methods[id.0 as usize]
    }

    fn class_for(&self, ty: &TypeDesc) -> Option<ClassId> {
        let resolved = ty.resolved();
        self.by_name
            .get(&(resolved.package.clone(), resolved.name.clone()))
            .copied()
    }

    fn find_functions(&self, package: &str, name: &str) -> Vec<MethodId> {
        self.functions
            .get(&(package.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstConstructor, AstElement, AstParam, TypeParam};

    #[test]
    fn lookups_by_type() {
        let mut program = Program::new();
        let foo = program.add_class(AstClass::new("app", "Foo"));
        assert_eq!(program.class_for(&TypeDesc::declared("app", "Foo")), Some(foo));
        assert_eq!(program.class_for(&TypeDesc::declared("", "Foo")), None);
        let alias = TypeDesc::alias("app", "Bar", TypeDesc::declared("app", "Foo"));
        assert_eq!(program.class_for(&alias), Some(foo));
    }

    #[test]
    fn members_are_attached_to_owner() {
        let mut program = Program::new();
        let foo = program.add_class(AstClass::new("", "Foo"));
        let m = program.add_method(foo, AstMethod::property("bar", TypeDesc::declared("", "Bar")));
        assert_eq!(program.class(foo).methods, vec![m]);
        assert_eq!(program.method(m).owner, Some(foo));
        assert_eq!(program.to_trace(AstElement::Method(m)), "Foo.bar: Bar");
    }

    #[test]
    fn top_level_functions_are_found() {
        let mut program = Program::new();
        let f = program.add_function(
            AstMethod::function("render", TypeDesc::unit()).in_package("app.ui"),
        );
        assert_eq!(program.find_functions("app.ui", "render"), vec![f]);
        assert!(program.find_functions("app", "render").is_empty());
    }

    #[test]
    fn inheritance_chain_is_subclass_first_and_deduplicated() {
        let mut program = Program::new();
        let base = program.add_class(AstClass::interface("", "Base"));
        let left = program.add_class(AstClass::interface("", "Left").extends(TypeDesc::declared("", "Base")));
        let right = program.add_class(AstClass::interface("", "Right").extends(TypeDesc::declared("", "Base")));
        let leaf = program.add_class(
            AstClass::new("", "Leaf")
                .extends(TypeDesc::declared("", "Left"))
                .extends(TypeDesc::declared("", "Right")),
        );
        assert_eq!(program.inheritance_chain(leaf), vec![leaf, left, base, right]);
    }

    #[test]
    fn assignability_follows_generic_supertypes() {
        let mut program = Program::new();
        let _ = program.add_class(
            AstClass::interface("", "Source").with_type_param(TypeParam::new("T")),
        );
        let _ = program.add_class(
            AstClass::new("", "StringSource")
                .extends(TypeDesc::declared("", "Source").with_args(vec![TypeDesc::declared("kotlin", "String")])),
        );
        let target = TypeDesc::declared("", "Source").with_args(vec![TypeDesc::declared("kotlin", "String")]);
        assert!(program.is_assignable_from(&target, &TypeDesc::declared("", "StringSource")));
        let other = TypeDesc::declared("", "Source").with_args(vec![TypeDesc::declared("kotlin", "Int")]);
        assert!(!program.is_assignable_from(&other, &TypeDesc::declared("", "StringSource")));
        assert!(!program.is_assignable_from(
            &TypeDesc::declared("", "StringSource"),
            &TypeDesc::declared("", "StringSource").nullable()
        ));
    }

    #[test]
    fn inherited_member_types_are_substituted() {
        let mut program = Program::new();
        let base = program.add_class(
            AstClass::interface("", "Provider").with_type_param(TypeParam::new("T")),
        );
        let get = program.add_method(base, AstMethod::property("value", TypeDesc::parameter("T")).make_abstract());
        let component = program.add_class(
            AstClass::new("", "C")
                .extends(TypeDesc::declared("", "Provider").with_args(vec![TypeDesc::declared("", "Foo")])),
        );
        assert_eq!(program.return_type_for(get, component), TypeDesc::declared("", "Foo"));
    }

    #[test]
    fn overrides_require_matching_signature_in_subtype() {
        let mut program = Program::new();
        let base = program.add_class(AstClass::interface("", "Base"));
        let abstract_foo = program.add_method(
            base,
            AstMethod::function("foo", TypeDesc::declared("", "Foo")).make_abstract(),
        );
        let impl_class = program.add_class(AstClass::new("", "Impl").extends(TypeDesc::declared("", "Base")));
        let concrete = program.add_method(impl_class, AstMethod::function("foo", TypeDesc::declared("", "Foo")));
        let overload = program.add_method(
            impl_class,
            AstMethod::function("foo", TypeDesc::declared("", "Foo"))
                .with_param(AstParam::new("x", TypeDesc::declared("kotlin", "Int"))),
        );
        assert!(program.overrides(concrete, abstract_foo));
        assert!(!program.overrides(abstract_foo, concrete));
        assert!(!program.overrides(overload, abstract_foo));
    }

    #[test]
    fn constructor_trace_lists_params() {
        let mut program = Program::new();
        let a = program.add_class(
            AstClass::new("", "A")
                .with_constructor(AstConstructor::new(vec![AstParam::new("b", TypeDesc::declared("", "B"))])),
        );
        assert_eq!(
            program.to_trace(AstElement::Constructor { class: a, index: 0 }),
            "A(b: B)"
        );
    }

    #[test]
    fn declared_scopes_carry_meta_annotation() {
        let mut program = Program::new();
        let scope = program.declare_scope("app", "Singleton");
        let class = program.annotation_class(&scope).expect("declared");
        assert!(program.class(class).has_annotation(SCOPE));
    }
}
