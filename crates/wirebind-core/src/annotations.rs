//! Annotation queries over the AST surface.

use wirebind_common::config::Options;
use wirebind_common::constants::{
    COMPONENT, INJECT, INTO_MAP, INTO_SET, JAVAX_INJECT, JAVAX_QUALIFIER, JAVAX_SCOPE, PROVIDES,
    QUALIFIER, SCOPE,
};
use wirebind_common::types::QualifiedName;

use crate::ast::{AstAnnotation, AstElement, AstMethod, AstProvider, ClassId, MethodKind, TypeDesc};
use crate::diagnostics::Messenger;

/// Answers annotation questions, honoring [`Options::enable_javax_annotations`].
#[derive(Clone, Copy)]
pub struct Annotations<'a> {
    provider: &'a dyn AstProvider,
    options: &'a Options,
}

impl<'a> Annotations<'a> {
    /// Creates a query helper.
    pub fn new(provider: &'a dyn AstProvider, options: &'a Options) -> Self {
        Self { provider, options }
    }

    /// Annotations in `annotations` whose class carries `meta`.
    fn annotated_with(&self, annotations: &[AstAnnotation], meta: QualifiedName) -> Vec<AstAnnotation> {
        annotations
            .iter()
            .filter(|annotation| {
                self.provider
                    .annotation_class(annotation)
                    .is_some_and(|class| self.provider.class(class).has_annotation(meta))
            })
            .cloned()
            .collect()
    }

    /// Scope annotations applied to a declaration.
    pub fn scopes(&self, annotations: &[AstAnnotation]) -> Vec<AstAnnotation> {
        let mut scopes = self.annotated_with(annotations, SCOPE);
        if self.options.enable_javax_annotations {
            scopes.extend(self.annotated_with(annotations, JAVAX_SCOPE));
        }
        scopes
    }

    /// The scope of a declaration, reporting more than one as an error.
    pub fn scope(
        &self,
        annotations: &[AstAnnotation],
        element: AstElement,
        messenger: &mut Messenger,
    ) -> Option<AstAnnotation> {
        let scopes = self.scopes(annotations);
        if scopes.len() > 1 {
            messenger.error(
                format!("Cannot apply multiple scopes: {}", render_list(&scopes)),
                Some(element),
            );
        }
        scopes.into_iter().next()
    }

    /// Qualifier annotations applied to a declaration. Native qualifiers win
    /// over javax ones.
    pub fn qualifiers(&self, annotations: &[AstAnnotation]) -> Vec<AstAnnotation> {
        let qualifiers = self.annotated_with(annotations, QUALIFIER);
        if qualifiers.is_empty() && self.options.enable_javax_annotations {
            return self.annotated_with(annotations, JAVAX_QUALIFIER);
        }
        qualifiers
    }

    /// The qualifier for a member of type `ty`: the member's own qualifier,
    /// else the type-use qualifier on `ty`.
    pub fn qualifier(
        &self,
        annotations: &[AstAnnotation],
        ty: &TypeDesc,
        element: AstElement,
        messenger: &mut Messenger,
    ) -> Option<AstAnnotation> {
        let mut qualifiers = self.qualifiers(annotations);
        if let Some(type_qualifier) = &ty.qualifier {
            if !qualifiers.contains(type_qualifier.as_ref()) {
                qualifiers.push((**type_qualifier).clone());
            }
        }
        if qualifiers.len() > 1 {
            messenger.error(
                format!("Cannot apply multiple qualifiers: {}", render_list(&qualifiers)),
                Some(element),
            );
        }
        check_inner_qualifiers(&ty.args, element, messenger);
        qualifiers.into_iter().next()
    }

    /// Returns true for `@Inject`, or `javax.inject.Inject` when enabled.
    pub fn is_inject(&self, annotations: &[AstAnnotation]) -> bool {
        annotations.iter().any(|a| {
            a.is(INJECT) || (self.options.enable_javax_annotations && a.is(JAVAX_INJECT))
        })
    }

    /// The injectable constructor of `class`: the primary constructor of an
    /// `@Inject` class, else its single `@Inject` constructor.
    pub fn inject_constructor(&self, class: ClassId, messenger: &mut Messenger) -> Option<usize> {
        let ast = self.provider.class(class);
        let annotated: Vec<usize> = ast
            .constructors
            .iter()
            .enumerate()
            .filter(|(_, c)| self.is_inject(&c.annotations))
            .map(|(index, _)| index)
            .collect();
        if self.is_inject(&ast.annotations) {
            if let Some(&index) = annotated.first() {
                messenger.error(
                    "Cannot annotate constructor with @Inject in an @Inject-annotated class",
                    Some(AstElement::Constructor { class, index }),
                );
            }
            return if ast.constructors.is_empty() { None } else { Some(0) };
        }
        if annotated.len() > 1 {
            messenger.error(
                "Class cannot contain multiple @Inject-annotated constructors",
                Some(AstElement::Class(class)),
            );
        }
        annotated.first().copied()
    }
}

/// Returns true if the declaration is a component.
pub fn is_component(annotations: &[AstAnnotation]) -> bool {
    annotations.iter().any(|a| a.is(COMPONENT))
}

/// Returns true if the member is a binding.
pub fn is_provides(method: &AstMethod) -> bool {
    method.has_annotation(PROVIDES)
}

/// Returns true if the member contributes to a set.
pub fn is_into_set(method: &AstMethod) -> bool {
    method.has_annotation(INTO_SET)
}

/// Returns true if the member contributes to a map.
pub fn is_into_map(method: &AstMethod) -> bool {
    method.has_annotation(INTO_MAP)
}

/// Returns true if the member is a provider passthrough: abstract,
/// parameterless, without receiver, returning a value.
pub fn is_provider(method: &AstMethod) -> bool {
    method.is_abstract
        && (method.kind == MethodKind::Property || method.params.is_empty())
        && method.receiver.is_none()
        && !method.return_type.is_unit()
}

fn check_inner_qualifiers(args: &[TypeDesc], element: AstElement, messenger: &mut Messenger) {
    for arg in args {
        if let Some(qualifier) = &arg.qualifier {
            messenger.error(
                format!("Qualifier: {qualifier} can only be applied to the outer type"),
                Some(element),
            );
        }
        check_inner_qualifiers(&arg.args, element, messenger);
    }
}

fn render_list(annotations: &[AstAnnotation]) -> String {
    let items = annotations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{items}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstClass, AstConstructor, Program};

    #[test]
    fn scopes_require_meta_annotation() {
        let mut program = Program::new();
        let scope = program.declare_scope("app", "Singleton");
        let unrelated = AstAnnotation::new("app", "Deprecated");
        let options = Options::default();
        let query = Annotations::new(&program, &options);
        assert_eq!(query.scopes(&[unrelated, scope.clone()]), vec![scope]);
    }

    #[test]
    fn javax_scopes_need_the_option() {
        let mut program = Program::new();
        let scope = program.declare_annotation("app", "Legacy", JAVAX_SCOPE);
        let off = Options::default();
        assert!(Annotations::new(&program, &off).scopes(&[scope.clone()]).is_empty());
        let on = Options {
            enable_javax_annotations: true,
            ..Options::default()
        };
        assert_eq!(Annotations::new(&program, &on).scopes(&[scope.clone()]), vec![scope]);
    }

    #[test]
    fn multiple_qualifiers_are_reported() {
        let mut program = Program::new();
        let a = program.declare_qualifier("app", "A");
        let b = program.declare_qualifier("app", "B");
        let host = program.add_class(AstClass::new("", "Host"));
        let options = Options::default();
        let query = Annotations::new(&program, &options);
        let mut messenger = Messenger::new();
        let ty = TypeDesc::declared("kotlin", "String").qualified(b);
        let qualifier = query.qualifier(&[a.clone()], &ty, AstElement::Class(host), &mut messenger);
        assert_eq!(qualifier, Some(a));
        let msg = &messenger.diagnostics()[0].message;
        assert!(msg.starts_with("Cannot apply multiple qualifiers: [@A, @B]"), "got: {msg}");
    }

    #[test]
    fn inner_qualifiers_are_reported() {
        let mut program = Program::new();
        let a = program.declare_qualifier("app", "A");
        let host = program.add_class(AstClass::new("", "Host"));
        let options = Options::default();
        let mut messenger = Messenger::new();
        let ty = TypeDesc::set_of(TypeDesc::declared("kotlin", "String").qualified(a));
        let _ = Annotations::new(&program, &options).qualifier(&[], &ty, AstElement::Class(host), &mut messenger);
        assert!(messenger.has_errors());
    }

    #[test]
    fn inject_class_uses_primary_constructor() {
        let mut program = Program::new();
        let class = program.add_class(
            AstClass::new("", "Foo")
                .annotated(INJECT)
                .with_constructor(AstConstructor::new(vec![]))
                .with_constructor(AstConstructor::new(vec![])),
        );
        let options = Options::default();
        let mut messenger = Messenger::new();
        let index = Annotations::new(&program, &options).inject_constructor(class, &mut messenger);
        assert_eq!(index, Some(0));
        assert!(!messenger.has_errors());
    }

    #[test]
    fn inject_on_both_class_and_constructor_is_an_error() {
        let mut program = Program::new();
        let class = program.add_class(
            AstClass::new("", "Foo")
                .annotated(INJECT)
                .with_constructor(AstConstructor::new(vec![]).annotated(INJECT)),
        );
        let options = Options::default();
        let mut messenger = Messenger::new();
        let _ = Annotations::new(&program, &options).inject_constructor(class, &mut messenger);
        assert!(messenger.diagnostics()[0]
            .message
            .contains("Cannot annotate constructor with @Inject"));
    }

    #[test]
    fn multiple_inject_constructors_are_an_error() {
        let mut program = Program::new();
        let class = program.add_class(
            AstClass::new("", "Foo")
                .with_constructor(AstConstructor::new(vec![]))
                .with_constructor(AstConstructor::new(vec![]).annotated(INJECT))
                .with_constructor(AstConstructor::new(vec![]).annotated(INJECT)),
        );
        let options = Options::default();
        let mut messenger = Messenger::new();
        let index = Annotations::new(&program, &options).inject_constructor(class, &mut messenger);
        assert_eq!(index, Some(1));
        assert!(messenger.has_errors());
    }

    #[test]
    fn provider_passthrough_shape() {
        let foo = TypeDesc::declared("", "Foo");
        assert!(is_provider(&AstMethod::property("foo", foo.clone()).make_abstract()));
        assert!(is_provider(&AstMethod::function("foo", foo.clone()).make_abstract()));
        assert!(!is_provider(&AstMethod::function("foo", foo.clone())));
        assert!(!is_provider(&AstMethod::function("run", TypeDesc::unit()).make_abstract()));
        assert!(!is_provider(
            &AstMethod::function("foo", foo.clone())
                .make_abstract()
                .with_receiver(foo)
        ));
    }
}
