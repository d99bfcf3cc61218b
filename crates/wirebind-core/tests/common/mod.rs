//! Fixture builders shared by the integration suites.

#![allow(dead_code)]

use wirebind_common::config::Options;
use wirebind_common::constants::{COMPONENT, INJECT, PROVIDES};
use wirebind_core::ast::{
    AstClass, AstConstructor, AstMethod, AstParam, ClassId, MethodId, Program, TypeDesc,
};
use wirebind_core::catalog::{self, CatalogCache};
use wirebind_core::context::Context;
use wirebind_core::diagnostics::Messenger;
use wirebind_core::plan::{Plan, PlanArena, PlanEntry};
use wirebind_core::resolver::Resolver;
use wirebind_core::session::{ComponentPlan, Session};

pub fn ty(name: &str) -> TypeDesc {
    TypeDesc::declared("", name)
}

pub fn string() -> TypeDesc {
    TypeDesc::declared("kotlin", "String")
}

pub fn param(name: &str, ty: TypeDesc) -> AstParam {
    AstParam::new(name, ty)
}

/// An `@Inject` class whose primary constructor takes `params`.
pub fn inject_class(program: &mut Program, name: &str, params: Vec<AstParam>) -> ClassId {
    program.add_class(
        AstClass::new("", name)
            .annotated(INJECT)
            .with_constructor(AstConstructor::new(params)),
    )
}

/// An abstract `@Component` class whose primary constructor takes `params`.
pub fn component(program: &mut Program, name: &str, params: Vec<AstParam>) -> ClassId {
    program.add_class(
        AstClass::new("", name)
            .make_abstract()
            .annotated(COMPONENT)
            .with_constructor(AstConstructor::new(params)),
    )
}

/// A `@Component` constructor parameter pointing at a parent component.
pub fn parent(name: &str, ty: TypeDesc) -> AstParam {
    AstParam::new(name, ty).annotated(COMPONENT).val()
}

/// An abstract property the component must implement.
pub fn accessor(program: &mut Program, owner: ClassId, name: &str, ty: TypeDesc) -> MethodId {
    program.add_method(owner, AstMethod::property(name, ty).make_abstract())
}

/// A concrete `@Provides` function without parameters.
pub fn provides(program: &mut Program, owner: ClassId, name: &str, ty: TypeDesc) -> MethodId {
    program.add_method(owner, AstMethod::function(name, ty).annotated(PROVIDES))
}

/// Output of resolving every accessor of one component, before
/// optimization.
pub struct Resolved {
    pub arena: PlanArena,
    pub entries: Vec<PlanEntry>,
    pub errors: Vec<String>,
    pub diagnostics: Vec<String>,
}

impl Resolved {
    pub fn entry(&self, name: &str) -> &PlanEntry {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .unwrap_or_else(|| panic!("no entry {name}, errors: {:?}", self.errors))
    }

    pub fn result(&self, name: &str) -> &Plan {
        self.arena.get(self.entry(name).result.id)
    }

    pub fn error(&self) -> &str {
        self.errors.first().map_or("", String::as_str)
    }
}

pub fn resolve(program: &Program, class: ClassId) -> Resolved {
    resolve_with(program, class, &Options::default())
}

pub fn resolve_with(program: &Program, class: ClassId, options: &Options) -> Resolved {
    let mut messenger = Messenger::new();
    let mut cache = CatalogCache::new();
    let catalog = catalog::collect(program, options, &mut messenger, &mut cache, class);
    let context = Context::new("InjectComponent", catalog);
    let mut resolver = Resolver::new(program, options, &mut messenger);
    let (entries, errors) = resolver.resolve_all(&context);
    let arena = resolver.into_arena();
    Resolved {
        arena,
        entries,
        errors: errors.into_iter().map(|(_, error)| error.to_string()).collect(),
        diagnostics: messenger
            .take()
            .into_iter()
            .map(|diagnostic| diagnostic.message)
            .collect(),
    }
}

pub fn generate(program: &Program, class: ClassId) -> ComponentPlan {
    generate_with(program, class, &Options::default())
}

pub fn generate_with(program: &Program, class: ClassId, options: &Options) -> ComponentPlan {
    Session::new(program, options).generate(class)
}

/// Messages of every diagnostic in `plan`.
pub fn messages(plan: &ComponentPlan) -> Vec<String> {
    plan.diagnostics.iter().map(|d| d.message.clone()).collect()
}

/// Installs a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
