//! Per-component generation.
//!
//! A [`Session`] validates a component declaration, builds its catalog,
//! resolves every abstract provider member, and hoists shared subtrees. Any
//! error turns the result into a stub: an empty forest carrying every
//! diagnostic, so a renderer can still emit a compilable class.

use std::rc::Rc;

use serde::Serialize;
use wirebind_common::config::Options;
use wirebind_common::constants::GENERATED_CLASS_PREFIX;
use wirebind_common::types::Severity;

use crate::annotations;
use crate::ast::{AstAnnotation, AstElement, AstProvider, ClassId, Visibility};
use crate::catalog::{self, CatalogCache};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, Messenger};
use crate::dump::dump_graph;
use crate::names::NameAllocator;
use crate::optimizer::optimize;
use crate::plan::PlanForest;
use crate::resolver::Resolver;

/// Output of [`Session::generate`] for one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentPlan {
    /// The component class.
    pub class: ClassId,
    /// Generated class name.
    pub name: String,
    /// The component's scope.
    pub scope: Option<AstAnnotation>,
    /// Accessor plans; empty for a stub.
    pub forest: PlanForest,
    /// Everything reported while generating.
    pub diagnostics: Vec<Diagnostic>,
    /// Whether generation failed and only a stub should be rendered.
    pub is_stub: bool,
}

impl ComponentPlan {
    /// Returns true if any error diagnostic was reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// One generation run over a source model. Catalogs are shared between
/// the components generated in the same session.
pub struct Session<'a> {
    provider: &'a dyn AstProvider,
    options: &'a Options,
    catalogs: CatalogCache,
}

impl<'a> Session<'a> {
    /// Creates a session over `provider`.
    pub fn new(provider: &'a dyn AstProvider, options: &'a Options) -> Self {
        Self {
            provider,
            options,
            catalogs: CatalogCache::new(),
        }
    }

    /// Generates the plan for component `class`.
    pub fn generate(&mut self, class: ClassId) -> ComponentPlan {
        let provider = self.provider;
        let ast = provider.class(class);
        let name = generated_name(&ast.name);
        tracing::info!(component = %ast, %name, "generating component");

        let mut messenger = Messenger::new();
        let stub = |scope, messenger: &mut Messenger| ComponentPlan {
            class,
            name: name.clone(),
            scope,
            forest: PlanForest::default(),
            diagnostics: messenger.take(),
            is_stub: true,
        };

        if !self.validate(class, &mut messenger) {
            return stub(None, &mut messenger);
        }
        let catalog = catalog::collect(provider, self.options, &mut messenger, &mut self.catalogs, class);
        if catalog.has_errors() {
            tracing::info!(%name, "component has declaration errors");
            if !messenger.has_errors() {
                // Reported by an earlier component sharing the catalog.
                let reason = catalog
                    .parents()
                    .iter()
                    .find(|parent| parent.catalog.has_errors())
                    .map_or_else(
                        || format!("@Component class: {ast} has declaration errors"),
                        |parent| {
                            let parent = provider.class(parent.catalog.class);
                            format!("Parent component: {parent} has declaration errors")
                        },
                    );
                messenger.error(reason, Some(AstElement::Class(class)));
            }
            return stub(catalog.scope.clone(), &mut messenger);
        }

        let context = Context::new(name.clone(), Rc::clone(&catalog));
        let mut resolver = Resolver::new(provider, self.options, &mut messenger);
        let (entries, errors) = resolver.resolve_all(&context);
        let arena = resolver.into_arena();
        if !errors.is_empty() {
            for (method, error) in errors {
                let element = error.element().or(Some(AstElement::Method(method)));
                messenger.error(error.to_string(), element);
            }
            tracing::info!(%name, "component failed to resolve");
            return stub(catalog.scope.clone(), &mut messenger);
        }
        if messenger.has_errors() {
            return stub(catalog.scope.clone(), &mut messenger);
        }

        let mut forest = PlanForest { arena, entries };
        let mut names = NameAllocator::new();
        for owner in provider.inheritance_chain(class) {
            for &method in &provider.class(owner).methods {
                names.reserve(&provider.method(method).name);
            }
        }
        if let Some(constructor) = ast.primary_constructor() {
            for param in &constructor.params {
                names.reserve(&param.name);
            }
        }
        optimize(&mut forest, &name, &mut names);

        if self.options.dump_graph {
            messenger.warn(dump_graph(&name, &forest), Some(AstElement::Class(class)));
        }
        tracing::info!(%name, entries = forest.entries.len(), nodes = forest.arena.len(), "component generated");
        ComponentPlan {
            class,
            name,
            scope: catalog.scope.clone(),
            forest,
            diagnostics: messenger.take(),
            is_stub: false,
        }
    }

    /// Checks the component declaration itself; returns false if it cannot
    /// be generated at all.
    fn validate(&self, class: ClassId, messenger: &mut Messenger) -> bool {
        let ast = self.provider.class(class);
        let element = Some(AstElement::Class(class));
        if !ast.is_abstract {
            messenger.error(format!("@Component class: {ast} must be abstract"), element);
            return false;
        }
        if ast.visibility == Visibility::Private {
            messenger.error(format!("@Component class: {ast} must not be private"), element);
            return false;
        }

        let mut valid = true;
        if let Some(constructor) = ast.primary_constructor() {
            let element = Some(AstElement::Constructor { class, index: 0 });
            for param in constructor
                .params
                .iter()
                .filter(|p| annotations::is_component(&p.annotations))
            {
                if !param.is_val {
                    messenger.error(format!("@Component parameter: {} must be val", param.name), element);
                    valid = false;
                } else if param.visibility == Visibility::Private {
                    messenger.error(
                        format!("@Component parameter: {} must not be private", param.name),
                        element,
                    );
                    valid = false;
                }
            }
        }
        valid
    }
}

/// `Inject` followed by the class's nesting path joined with `_`.
fn generated_name(class_name: &str) -> String {
    format!("{GENERATED_CLASS_PREFIX}{}", class_name.replace('.', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_flatten_nesting() {
        assert_eq!(generated_name("AppComponent"), "InjectAppComponent");
        assert_eq!(generated_name("Outer.Inner"), "InjectOuter_Inner");
    }
}
