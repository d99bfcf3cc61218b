//! Binding catalog.
//!
//! A [`ComponentCatalog`] indexes everything one component can bind: its
//! `@Provides` members (direct, container and generic), its provider
//! passthroughs, its scope, and links to the catalogs of its parent
//! components. Catalogs are memoized per class in a [`CatalogCache`] owned by
//! the generation session, so a class reached as a parent several times is
//! scanned once.

use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use wirebind_common::config::Options;

use crate::accessor::Accessor;
use crate::annotations::{self, Annotations};
use crate::ast::{AstAnnotation, AstElement, AstProvider, ClassId, MethodId, TypeDesc, Visibility};
use crate::diagnostics::Messenger;
use crate::plan::ContainerKind;
use crate::type_key::TypeKey;

/// A `@Provides` member reachable from a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBinding {
    /// The member.
    pub method: MethodId,
    /// Path from the requesting component to the declaring one.
    pub accessor: Accessor,
    /// Component owning the member's scope, when the member is scoped.
    pub scoped_component: Option<ClassId>,
}

impl MethodBinding {
    fn prefixed(&self, prefix: &Accessor) -> Self {
        Self {
            accessor: prefix.join(&self.accessor),
            ..self.clone()
        }
    }
}

/// A source of values for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Binding {
    /// An injectable constructor.
    Constructor {
        /// Declaring class.
        class: ClassId,
        /// Position of the constructor.
        index: usize,
        /// The requested, fully instantiated class type.
        ty: TypeDesc,
        /// Path to the component owning the class's scope.
        accessor: Accessor,
        /// Component owning the class's scope, when the class is scoped.
        scoped_component: Option<ClassId>,
    },
    /// A `@Provides` member or a provider passthrough.
    Method(MethodBinding),
    /// Contributions to a set or map.
    Container {
        /// Container shape.
        container: ContainerKind,
        /// Contributors, own first, then parents in catalog-walk order.
        args: Vec<MethodBinding>,
    },
    /// An injectable singleton object.
    Object {
        /// The object class.
        class: ClassId,
    },
}

/// A generic `@Provides` member, matched by pattern at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericBinding {
    /// The member.
    pub binding: MethodBinding,
    /// Return type mentioning the member's type parameters.
    pub pattern: TypeDesc,
    /// Member qualifier.
    pub qualifier: Option<AstAnnotation>,
}

/// The component owning a scope, as seen from a requesting component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedComponent {
    /// The owning component.
    pub class: ClassId,
    /// Path to it.
    pub accessor: Accessor,
}

/// A parent component reachable through a constructor field.
#[derive(Debug, Clone)]
pub struct ParentCatalog {
    /// Field path from the child to the parent.
    pub accessor: Accessor,
    /// The parent's catalog.
    pub catalog: Rc<ComponentCatalog>,
}

#[derive(Debug, Clone)]
struct ContainerEntry {
    container: ContainerKind,
    source: MethodId,
    args: Vec<MethodBinding>,
}

/// Everything one component can bind.
#[derive(Debug, Clone)]
pub struct ComponentCatalog {
    /// The component class.
    pub class: ClassId,
    /// The component's scope.
    pub scope: Option<AstAnnotation>,
    /// Abstract members to implement, in declaration order.
    pub provider_methods: Vec<MethodId>,
    types: IndexMap<TypeKey, MethodBinding>,
    containers: IndexMap<TypeKey, ContainerEntry>,
    generics: Vec<GenericBinding>,
    provider_types: IndexMap<TypeKey, MethodBinding>,
    /// Keys provided more than once; they bind nothing.
    duplicated: FxHashSet<TypeKey>,
    parents: Vec<ParentCatalog>,
    has_errors: bool,
}

/// A binding found by [`ComponentCatalog::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    /// The binding, with accessors relative to the requesting component.
    pub binding: Binding,
    /// The catalog that declared it.
    pub owner: ClassId,
}

impl ComponentCatalog {
    fn empty(class: ClassId) -> Self {
        Self {
            class,
            scope: None,
            provider_methods: Vec::new(),
            types: IndexMap::new(),
            containers: IndexMap::new(),
            generics: Vec::new(),
            provider_types: IndexMap::new(),
            duplicated: FxHashSet::default(),
            parents: Vec::new(),
            has_errors: false,
        }
    }

    /// Returns true if building this catalog or any parent reported an error.
    pub const fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Parent links, in declaration order.
    pub fn parents(&self) -> &[ParentCatalog] {
        &self.parents
    }

    /// This catalog followed by every ancestor, closest first, each paired
    /// with the path to it.
    pub fn walk(&self) -> Vec<(Accessor, &Self)> {
        let mut out = vec![(Accessor::EMPTY, self)];
        let mut index = 0;
        while index < out.len() {
            let (accessor, catalog) = (out[index].0.clone(), out[index].1);
            for parent in &catalog.parents {
                out.push((accessor.join(&parent.accessor), parent.catalog.as_ref()));
            }
            index += 1;
        }
        out
    }

    /// Finds a direct binding or passthrough for `key`, nearest catalog
    /// first. In a parent catalog a passthrough wins over a direct binding.
    /// A key provided twice by the nearest catalog declaring it is unbound.
    pub fn lookup(&self, key: &TypeKey) -> Option<CatalogMatch> {
        for (accessor, catalog) in self.walk() {
            let found = if accessor.is_not_empty() {
                catalog
                    .provider_types
                    .get(key)
                    .or_else(|| catalog.types.get(key))
            } else {
                catalog.types.get(key)
            };
            let Some(found) = found else {
                continue;
            };
            if catalog.duplicated.contains(key) {
                return None;
            }
            return Some(CatalogMatch {
                binding: Binding::Method(found.prefixed(&accessor)),
                owner: catalog.class,
            });
        }
        None
    }

    /// Aggregates every container contribution for `key` across this
    /// catalog and its ancestors.
    pub fn containers(&self, key: &TypeKey) -> Option<Binding> {
        let mut container = None;
        let mut args = Vec::new();
        for (accessor, catalog) in self.walk() {
            let Some(entry) = catalog.containers.get(key) else {
                continue;
            };
            if *container.get_or_insert(entry.container) != entry.container {
                continue;
            }
            args.extend(entry.args.iter().map(|arg| arg.prefixed(&accessor)));
        }
        container.map(|container| Binding::Container { container, args })
    }

    /// Generic bindings across this catalog and its ancestors, nearest
    /// first.
    pub fn generics(&self) -> Vec<GenericBinding> {
        self.walk()
            .into_iter()
            .flat_map(|(accessor, catalog)| {
                catalog.generics.iter().map(move |generic| GenericBinding {
                    binding: generic.binding.prefixed(&accessor),
                    ..generic.clone()
                })
            })
            .collect()
    }

    /// The nearest component whose scope is `scope`.
    pub fn scoped_component(&self, scope: &AstAnnotation) -> Option<ScopedComponent> {
        self.walk()
            .into_iter()
            .find(|(_, catalog)| catalog.scope.as_ref() == Some(scope))
            .map(|(accessor, catalog)| ScopedComponent {
                class: catalog.class,
                accessor,
            })
    }

    /// The direct bindings declared by this catalog itself.
    pub fn direct_keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.types.keys()
    }
}

/// Memoized catalogs for one generation session.
#[derive(Debug, Default)]
pub struct CatalogCache {
    catalogs: FxHashMap<ClassId, Rc<ComponentCatalog>>,
    in_progress: FxHashSet<ClassId>,
}

impl CatalogCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized catalogs.
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    /// Returns true if nothing has been memoized.
    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

/// Builds (or fetches) the catalog of `class`, reporting declaration
/// problems to `messenger`.
pub fn collect(
    provider: &dyn AstProvider,
    options: &Options,
    messenger: &mut Messenger,
    cache: &mut CatalogCache,
    class: ClassId,
) -> Rc<ComponentCatalog> {
    Collector {
        provider,
        annotations: Annotations::new(provider, options),
        messenger,
        cache,
    }
    .collect(class)
}

struct TypeInfo {
    scope: Option<AstAnnotation>,
    provides: Vec<MethodId>,
    providers: Vec<MethodId>,
}

struct Collector<'a> {
    provider: &'a dyn AstProvider,
    annotations: Annotations<'a>,
    messenger: &'a mut Messenger,
    cache: &'a mut CatalogCache,
}

impl Collector<'_> {
    fn collect(&mut self, class: ClassId) -> Rc<ComponentCatalog> {
        if let Some(catalog) = self.cache.catalogs.get(&class) {
            return Rc::clone(catalog);
        }
        let ast = self.provider.class(class);
        if !self.cache.in_progress.insert(class) {
            self.messenger.error(
                format!("Cannot use component: {ast} as its own parent"),
                Some(AstElement::Class(class)),
            );
            let mut catalog = ComponentCatalog::empty(class);
            catalog.has_errors = true;
            return Rc::new(catalog);
        }
        tracing::debug!(component = %ast, "collecting bindings");

        let errors_before = self.messenger.error_count();
        let info = self.scan(class);
        let mut catalog = ComponentCatalog::empty(class);
        catalog.scope = info.scope;
        catalog.provider_methods.clone_from(&info.providers);

        for &method in &info.provides {
            self.register_provides(&mut catalog, method);
        }
        for &method in &info.providers {
            let ret = self.provider.return_type_for(method, class);
            let ast_method = self.provider.method(method);
            let qualifier = self.annotations.qualifier(
                &ast_method.annotations,
                &ret,
                AstElement::Method(method),
                self.messenger,
            );
            let _ = catalog
                .provider_types
                .entry(TypeKey::new(ret, qualifier))
                .or_insert(MethodBinding {
                    method,
                    accessor: Accessor::EMPTY,
                    scoped_component: None,
                });
        }
        self.link_parents(&mut catalog);

        catalog.has_errors = self.messenger.error_count() > errors_before
            || catalog.parents.iter().any(|p| p.catalog.has_errors);
        let _ = self.cache.in_progress.remove(&class);
        let catalog = Rc::new(catalog);
        let _ = self.cache.catalogs.insert(class, Rc::clone(&catalog));
        catalog
    }

    /// Walks the inheritance chain once, collecting the scope, the
    /// `@Provides` members (overrides replacing what they override) and the
    /// provider passthroughs.
    fn scan(&mut self, class: ClassId) -> TypeInfo {
        let is_component = annotations::is_component(&self.provider.class(class).annotations);
        let mut scope: Option<(AstAnnotation, ClassId)> = None;
        let mut seen: Vec<MethodId> = Vec::new();
        let mut provides = Vec::new();
        let mut providers = Vec::new();

        for current in self.provider.inheritance_chain(class) {
            let ast = self.provider.class(current);
            if let Some(found) =
                self.annotations
                    .scope(&ast.annotations, AstElement::Class(current), self.messenger)
            {
                if let Some((existing, owner)) = &scope {
                    if *existing != found {
                        self.messenger.error(
                            format!("Cannot apply scope: {found}"),
                            Some(AstElement::Class(current)),
                        );
                        self.messenger.error(
                            format!("as scope: {existing} is already applied"),
                            Some(AstElement::Class(*owner)),
                        );
                    }
                } else {
                    scope = Some((found, current));
                }
            }

            for &method in &ast.methods {
                let ast_method = self.provider.method(method);
                if let Some(&overriding) = seen.iter().find(|&&s| self.provider.overrides(s, method)) {
                    let overriding_ast = self.provider.method(overriding);
                    if annotations::is_provides(ast_method)
                        && !annotations::is_provides(overriding_ast)
                        && !provides.contains(&overriding)
                        && self.check_provides(overriding, is_component)
                    {
                        provides.push(overriding);
                    }
                    continue;
                }
                seen.push(method);
                if annotations::is_provides(ast_method) {
                    if self.check_provides(method, is_component) {
                        provides.push(method);
                    }
                } else if annotations::is_provider(ast_method) {
                    providers.push(method);
                }
            }
        }

        TypeInfo {
            scope: scope.map(|(scope, _)| scope),
            provides,
            providers,
        }
    }

    fn check_provides(&mut self, method: MethodId, is_component: bool) -> bool {
        let ast = self.provider.method(method);
        let element = Some(AstElement::Method(method));
        if ast.visibility == Visibility::Private {
            self.messenger.error("@Provides method must not be private", element);
            return false;
        }
        if ast.return_type.is_unit() {
            self.messenger.error("@Provides method must return a value", element);
            return false;
        }
        if is_component && ast.is_abstract {
            self.messenger
                .error("@Provides method must have a concrete implementation", element);
            return false;
        }
        true
    }

    fn register_provides(&mut self, catalog: &mut ComponentCatalog, method: MethodId) {
        let class = catalog.class;
        let ast = self.provider.method(method);
        let element = AstElement::Method(method);
        let ret = self.provider.return_type_for(method, class);
        let qualifier = self
            .annotations
            .qualifier(&ast.annotations, &ret, element, self.messenger);

        let method_scope = self
            .annotations
            .scope(&ast.annotations, element, self.messenger);
        if let Some(method_scope) = &method_scope {
            match &catalog.scope {
                None => self.messenger.error(
                    format!("@Provides with scope: {method_scope} cannot be provided in an unscoped component"),
                    Some(element),
                ),
                Some(scope) if scope != method_scope => self.messenger.error(
                    format!("@Provides with scope: {method_scope} must match component scope: {scope}"),
                    Some(element),
                ),
                Some(_) => {}
            }
        }
        let binding = MethodBinding {
            method,
            accessor: Accessor::EMPTY,
            scoped_component: method_scope.map(|_| class),
        };

        if annotations::is_into_map(ast) {
            if !ret.is_pair() {
                self.messenger
                    .error("@IntoMap must have return type of type Pair", Some(element));
                return;
            }
            let pair = ret.resolved();
            let key = TypeKey::new(
                TypeDesc::map_of(pair.args[0].clone(), pair.args[1].clone()),
                qualifier,
            );
            self.add_container(catalog, key, ContainerKind::Map, binding);
        } else if annotations::is_into_set(ast) {
            let key = TypeKey::new(TypeDesc::set_of(ret.without_qualifier()), qualifier);
            self.add_container(catalog, key, ContainerKind::Set, binding);
        } else if !ast.type_params.is_empty() || ret.mentions_type_parameters() {
            tracing::debug!(pattern = %ret, "generic binding");
            catalog.generics.push(GenericBinding {
                binding,
                pattern: ret,
                qualifier,
            });
        } else {
            let key = TypeKey::new(ret, qualifier);
            if let Some(existing) = catalog.types.get(&key) {
                let existing = existing.method;
                self.duplicate(&key, method, existing);
                let _ = catalog.duplicated.insert(key);
                return;
            }
            tracing::debug!(%key, "binding");
            let _ = catalog.types.insert(key, binding);
        }
    }

    fn add_container(
        &mut self,
        catalog: &mut ComponentCatalog,
        key: TypeKey,
        container: ContainerKind,
        binding: MethodBinding,
    ) {
        match catalog.containers.get_mut(&key) {
            Some(entry) if entry.container == container => entry.args.push(binding),
            Some(entry) => {
                let existing = entry.source;
                self.duplicate(&key, binding.method, existing);
            }
            None => {
                let _ = catalog.containers.insert(
                    key,
                    ContainerEntry {
                        container,
                        source: binding.method,
                        args: vec![binding],
                    },
                );
            }
        }
    }

    fn duplicate(&mut self, key: &TypeKey, method: MethodId, existing: MethodId) {
        self.messenger
            .error(format!("Cannot provide: {key}"), Some(AstElement::Method(method)));
        self.messenger
            .error("as it is already provided", Some(AstElement::Method(existing)));
    }

    /// Links the parent components named by `@Component` constructor
    /// parameters.
    fn link_parents(&mut self, catalog: &mut ComponentCatalog) {
        let class = catalog.class;
        let Some(constructor) = self.provider.class(class).primary_constructor() else {
            return;
        };
        let element = AstElement::Constructor { class, index: 0 };
        for param in &constructor.params {
            if !annotations::is_component(&param.annotations) {
                continue;
            }
            let Some(parent_class) = self.provider.class_for(&param.ty) else {
                self.messenger
                    .error(format!("Cannot find component: {}", param.ty), Some(element));
                continue;
            };
            let parent = self.collect(parent_class);

            if let Some(scope) = &catalog.scope {
                if let Some(owner) = parent.scoped_component(scope) {
                    self.messenger
                        .error(format!("Cannot apply scope: {scope}"), Some(AstElement::Class(class)));
                    self.messenger.error(
                        format!("as scope: {scope} is already applied to parent"),
                        Some(AstElement::Class(owner.class)),
                    );
                }
            }
            for (key, binding) in &parent.types {
                let visibility = self.provider.method(binding.method).visibility;
                if visibility == Visibility::Protected && !parent.provider_types.contains_key(key) {
                    self.messenger.error(
                        "@Provides method is not accessible",
                        Some(AstElement::Method(binding.method)),
                    );
                }
            }
            catalog.parents.push(ParentCatalog {
                accessor: Accessor::EMPTY.plus(param.name.clone()),
                catalog: parent,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use wirebind_common::constants::{COMPONENT, INTO_SET, PROVIDES};

    use super::*;
    use crate::ast::{AstClass, AstConstructor, AstMethod, AstParam, Program};

    fn ty(name: &str) -> TypeDesc {
        TypeDesc::declared("", name)
    }

    fn component(program: &mut Program, name: &str, params: Vec<AstParam>) -> ClassId {
        program.add_class(
            AstClass::new("", name)
                .make_abstract()
                .annotated(COMPONENT)
                .with_constructor(AstConstructor::new(params)),
        )
    }

    fn build(program: &Program, class: ClassId) -> (Rc<ComponentCatalog>, Messenger) {
        let mut messenger = Messenger::new();
        let mut cache = CatalogCache::new();
        let catalog = collect(program, &Options::default(), &mut messenger, &mut cache, class);
        (catalog, messenger)
    }

    #[test]
    fn registers_provides_and_passthroughs() {
        let mut program = Program::new();
        let c = component(&mut program, "C", vec![]);
        let provides = program.add_method(c, AstMethod::function("foo", ty("Foo")).annotated(PROVIDES));
        let accessor = program.add_method(c, AstMethod::property("bar", ty("Bar")).make_abstract());
        let (catalog, messenger) = build(&program, c);
        assert!(!messenger.has_errors());
        assert_eq!(catalog.provider_methods, vec![accessor]);
        let found = catalog.lookup(&TypeKey::of(ty("Foo"))).expect("foo bound");
        assert_eq!(
            found.binding,
            Binding::Method(MethodBinding {
                method: provides,
                accessor: Accessor::EMPTY,
                scoped_component: None,
            })
        );
        assert!(catalog.lookup(&TypeKey::of(ty("Bar"))).is_none());
    }

    #[test]
    fn duplicate_bindings_name_both_sites() {
        let mut program = Program::new();
        let c = component(&mut program, "C", vec![]);
        let _ = program.add_method(c, AstMethod::function("one", ty("Foo")).annotated(PROVIDES));
        let _ = program.add_method(c, AstMethod::function("two", ty("Foo")).annotated(PROVIDES));
        let (catalog, messenger) = build(&program, c);
        let messages: Vec<&str> = messenger.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Cannot provide: Foo", "as it is already provided"]);
        assert!(catalog.has_errors());
        assert!(catalog.lookup(&TypeKey::of(ty("Foo"))).is_none());
    }

    #[test]
    fn parents_are_searched_with_accessor_paths() {
        let mut program = Program::new();
        let parent = component(&mut program, "Parent", vec![]);
        let bar = program.add_method(parent, AstMethod::function("bar", ty("Bar")).annotated(PROVIDES));
        let child = component(
            &mut program,
            "Child",
            vec![AstParam::new("parent", ty("Parent")).annotated(COMPONENT).val()],
        );
        let (catalog, _) = build(&program, child);
        let found = catalog.lookup(&TypeKey::of(ty("Bar"))).expect("bar bound");
        assert_eq!(found.owner, parent);
        let Binding::Method(binding) = found.binding else {
            panic!("expected method binding");
        };
        assert_eq!(binding.method, bar);
        assert_eq!(binding.accessor.to_string(), "parent");
    }

    #[test]
    fn parent_catalogs_are_memoized() {
        let mut program = Program::new();
        let parent = component(&mut program, "Parent", vec![]);
        let a = component(
            &mut program,
            "A",
            vec![AstParam::new("parent", ty("Parent")).annotated(COMPONENT).val()],
        );
        let b = component(
            &mut program,
            "B",
            vec![AstParam::new("parent", ty("Parent")).annotated(COMPONENT).val()],
        );
        let mut messenger = Messenger::new();
        let mut cache = CatalogCache::new();
        let options = Options::default();
        let first = collect(&program, &options, &mut messenger, &mut cache, a);
        let second = collect(&program, &options, &mut messenger, &mut cache, b);
        assert!(Rc::ptr_eq(&first.parents()[0].catalog, &second.parents()[0].catalog));
        assert_eq!(cache.len(), 3);
        assert_eq!(first.parents()[0].catalog.class, parent);
    }

    #[test]
    fn set_contributions_aggregate_in_order() {
        let mut program = Program::new();
        let c = component(&mut program, "C", vec![]);
        let string = TypeDesc::declared("kotlin", "String");
        let one = program.add_method(
            c,
            AstMethod::function("one", string.clone()).annotated(PROVIDES).annotated(INTO_SET),
        );
        let two = program.add_method(
            c,
            AstMethod::function("two", string.clone()).annotated(PROVIDES).annotated(INTO_SET),
        );
        let (catalog, messenger) = build(&program, c);
        assert!(!messenger.has_errors());
        let Some(Binding::Container { container, args }) =
            catalog.containers(&TypeKey::of(TypeDesc::set_of(string)))
        else {
            panic!("expected container");
        };
        assert_eq!(container, ContainerKind::Set);
        assert_eq!(args.iter().map(|a| a.method).collect::<Vec<_>>(), vec![one, two]);
    }
}
