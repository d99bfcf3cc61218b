//! Type result resolution.
//!
//! Turns a requested [`TypeKey`] into a [`Plan`] tree. A request is served
//! from, in order: the plan cache, a lambda argument in scope, the catalog
//! (direct bindings and passthroughs nearest first, then container
//! contributions, then the requested class's injectable constructor or
//! object), a synthesized function or `Lazy` wrapper, and finally a generic
//! binding whose pattern and bounds match. Every construction step runs
//! under the [`CycleDetector`]; a cycle crossing a deferred wrapper becomes a
//! `LocalVar` bound by a `LateInit` around the outer construction.
//!
//! Plans whose subtree is closed (no free lambda argument or local
//! variable) are cached per key, so repeated requests share one node.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use wirebind_common::config::Options;
use wirebind_common::constants::ARG_NAME_PREFIX;

use crate::accessor::Accessor;
use crate::annotations::Annotations;
use crate::ast::{
    AstElement, AstParam, AstProvider, ClassId, ClassKind, MethodId, MethodKind, Substitution,
    TypeDesc, TypeParam,
};
use crate::catalog::{Binding, MethodBinding};
use crate::context::{Context, NamedArg};
use crate::cycle::{CycleDetector, CycleResult};
use crate::diagnostics::Messenger;
use crate::error::{Result, ResolveError, with_trace};
use crate::names::NameAllocator;
use crate::plan::{ContainerKind, Plan, PlanArena, PlanEntry, PlanId, PlanRef};
use crate::type_key::TypeKey;

/// Resolves requests for one component into plans sharing one arena.
pub struct Resolver<'a> {
    provider: &'a dyn AstProvider,
    annotations: Annotations<'a>,
    messenger: &'a mut Messenger,
    cycle_detector: CycleDetector,
    arena: PlanArena,
    cache: FxHashMap<TypeKey, PlanId>,
    arg_names: NameAllocator,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver reporting declaration problems to `messenger`.
    pub fn new(provider: &'a dyn AstProvider, options: &'a Options, messenger: &'a mut Messenger) -> Self {
        Self {
            provider,
            annotations: Annotations::new(provider, options),
            messenger,
            cycle_detector: CycleDetector::new(),
            arena: PlanArena::new(),
            cache: FxHashMap::default(),
            arg_names: NameAllocator::new(),
        }
    }

    /// The arena plans are allocated in.
    pub const fn arena(&self) -> &PlanArena {
        &self.arena
    }

    /// Returns true if a finished plan for `key` is memoized.
    pub fn is_cached(&self, key: &TypeKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Consumes the resolver, keeping its plans.
    pub fn into_arena(self) -> PlanArena {
        self.arena
    }

    /// Resolves every abstract provider member of the context's component.
    ///
    /// Each member is resolved independently; failures are returned, paired
    /// with the member, alongside the entries that succeeded.
    pub fn resolve_all(&mut self, context: &Context) -> (Vec<PlanEntry>, Vec<(MethodId, ResolveError)>) {
        let class = context.catalog.class;
        let mut entries = Vec::new();
        let mut errors = Vec::new();
        for &method in &context.catalog.provider_methods {
            self.cycle_detector.reset();
            self.arg_names = NameAllocator::new();
            let provider = self.provider;
            let ast = provider.method(method);
            let element = AstElement::Method(method);
            let return_type = self.provider.return_type_for(method, class);
            let qualifier =
                self.annotations
                    .qualifier(&ast.annotations, &return_type, element, self.messenger);
            let key = TypeKey::new(return_type.clone(), qualifier);
            tracing::debug!(member = %ast.name, %key, "resolving accessor");

            let result = self
                .with_cycle_detection(&key, element, |this| this.resolve(context, &key).map(|r| r.id))
                .and_then(|id| {
                    if let Some(trace) = self.cycle_detector.pending_trace(self.provider) {
                        Err(ResolveError::Cycle {
                            message: with_trace("Cycle detected", &trace),
                            element: Some(element),
                        })
                    } else {
                        Ok(id)
                    }
                });
            match result {
                Ok(id) => entries.push(PlanEntry {
                    name: ast.name.clone(),
                    return_type: return_type.without_qualifier(),
                    is_property: ast.kind == MethodKind::Property,
                    is_private: false,
                    is_override: true,
                    is_suspend: ast.is_suspend,
                    result: PlanRef::new(key, id),
                }),
                Err(error) => {
                    tracing::debug!(member = %ast.name, %error, "accessor failed");
                    errors.push((method, error));
                }
            }
        }
        (entries, errors)
    }

    /// Resolves `key`, failing if nothing binds it.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` or anything it depends on cannot be bound,
    /// or if construction is cyclic without a deferral point.
    pub fn resolve(&mut self, context: &Context, key: &TypeKey) -> Result<PlanRef> {
        match self.resolve_or_none(context, key)? {
            Some(plan) => Ok(plan),
            None => Err(self.cannot_find(key)),
        }
    }

    /// Resolves `key`, returning `None` if nothing binds `key` itself.
    /// Failures deeper in the tree are still errors.
    fn resolve_or_none(&mut self, context: &Context, key: &TypeKey) -> Result<Option<PlanRef>> {
        let cacheable = context.args.is_empty() && !context.skips_scope_of(key);
        if cacheable {
            if let Some(&id) = self.cache.get(key) {
                tracing::trace!(%key, "cache hit");
                return Ok(Some(PlanRef::new(key.clone(), id)));
            }
        }
        let Some(id) = self.find_plan(context, key)? else {
            return Ok(None);
        };
        if self.arena.is_closed(id) && !context.skips_scope_of(key) {
            let _ = self.cache.entry(key.clone()).or_insert(id);
        }
        Ok(Some(PlanRef::new(key.clone(), id)))
    }

    fn find_plan(&mut self, context: &Context, key: &TypeKey) -> Result<Option<PlanId>> {
        tracing::trace!(%key, "resolving");
        if key.ty.is_error() {
            return Err(ResolveError::Unresolved {
                key: key.clone(),
                message: format!("Unresolved reference: {key}"),
            });
        }
        if let Some(arg) = context.find_arg(self.provider, key) {
            return Ok(Some(self.arena.alloc(Plan::Arg {
                name: arg.name.clone(),
            })));
        }
        if let Some(binding) = self.find_binding(context, key)? {
            return self.binding_plan(context, key, binding).map(Some);
        }
        if key.ty.is_function() {
            return self.function_plan(context, key).map(Some);
        }
        if key.ty.is_lazy() {
            return self.lazy_plan(context, key).map(Some);
        }
        self.generic_plan(context, key)
    }

    fn find_binding(&mut self, context: &Context, key: &TypeKey) -> Result<Option<Binding>> {
        if let Some(found) = context.catalog.lookup(key) {
            return Ok(Some(found.binding));
        }
        if let Some(container) = context.catalog.containers(key) {
            return Ok(Some(container));
        }
        if key.qualifier.is_some() || key.ty.is_type_alias() {
            return Ok(None);
        }
        let provider = self.provider;
        let Some(class) = provider.class_for(&key.ty) else {
            return Ok(None);
        };
        let ast = provider.class(class);
        if ast.kind == ClassKind::Object {
            return Ok(self
                .annotations
                .is_inject(&ast.annotations)
                .then_some(Binding::Object { class }));
        }
        if key.ty.args.len() != ast.type_params.len() {
            return Ok(None);
        }
        let Some(index) = self.annotations.inject_constructor(class, self.messenger) else {
            return Ok(None);
        };
        let substitution = ast.substitution_for(&key.ty);
        if !self.bounds_satisfied(&ast.type_params, &substitution) {
            tracing::debug!(%key, "type arguments do not satisfy bounds");
            return Ok(None);
        }

        let element = AstElement::Class(class);
        let (accessor, scoped_component) =
            match self.annotations.scope(&ast.annotations, element, self.messenger) {
                None => (Accessor::EMPTY, None),
                Some(scope) => match context.catalog.scoped_component(&scope) {
                    Some(owner) => (owner.accessor, Some(owner.class)),
                    None => {
                        return Err(ResolveError::ScopeNotFound {
                            message: self.with_trace(format!(
                                "Cannot find component with scope: {scope} to inject {ast}"
                            )),
                            element: Some(element),
                        });
                    }
                },
            };
        Ok(Some(Binding::Constructor {
            class,
            index,
            ty: key.ty.clone(),
            accessor,
            scoped_component,
        }))
    }

    fn bounds_satisfied(&self, params: &[TypeParam], substitution: &Substitution) -> bool {
        params.iter().all(|param| {
            substitution.get(&param.name).is_some_and(|arg| {
                param.bounds.iter().all(|bound| {
                    self.provider
                        .is_assignable_from(&bound.substitute(substitution), arg)
                })
            })
        })
    }

    fn binding_plan(&mut self, context: &Context, key: &TypeKey, binding: Binding) -> Result<PlanId> {
        match binding {
            Binding::Constructor {
                accessor,
                scoped_component: Some(_),
                ..
            } if !context.skips_scope_of(key) => self.scoped_plan(context, key, accessor),
            Binding::Constructor { class, index, ty, .. } => {
                self.constructor_plan(context, key, class, index, &ty)
            }
            Binding::Method(binding) => {
                self.method_plan(context, key, &binding, &Substitution::default())
            }
            Binding::Container { container, args } => self.container_plan(context, container, &args),
            Binding::Object { class } => {
                let ty = self.provider.class(class).ty();
                Ok(self.arena.alloc(Plan::Object { ty }))
            }
        }
    }

    fn scoped_plan(&mut self, context: &Context, key: &TypeKey, accessor: Accessor) -> Result<PlanId> {
        let result = self.resolve(&context.without_scoped(key), key)?;
        Ok(self.arena.alloc(Plan::Scoped {
            key: key.to_string(),
            accessor,
            result,
        }))
    }

    fn method_plan(
        &mut self,
        context: &Context,
        key: &TypeKey,
        binding: &MethodBinding,
        substitution: &Substitution,
    ) -> Result<PlanId> {
        if binding.scoped_component.is_some() && !context.skips_scope_of(key) {
            return self.scoped_plan(context, key, binding.accessor.clone());
        }
        self.provides_plan(context, key, binding, substitution)
    }

    fn constructor_plan(
        &mut self,
        context: &Context,
        key: &TypeKey,
        class: ClassId,
        index: usize,
        ty: &TypeDesc,
    ) -> Result<PlanId> {
        let element = AstElement::Constructor { class, index };
        let provider = self.provider;
        self.with_cycle_detection(key, element, |this| {
            let ast = provider.class(class);
            let Some(constructor) = ast.constructors.get(index) else {
                return Err(ResolveError::Failed {
                    message: format!("Cannot find constructor of {ast}"),
                    element: Some(AstElement::Class(class)),
                });
            };
            let substitution = ast.substitution_for(ty);
            let parameters = this.resolve_params(context, &constructor.params, &substitution, element)?;
            Ok(this.arena.alloc(Plan::Constructor {
                ty: ty.clone(),
                parameters,
                supports_named_arguments: constructor.supports_named_arguments,
            }))
        })
    }

    fn provides_plan(
        &mut self,
        context: &Context,
        key: &TypeKey,
        binding: &MethodBinding,
        substitution: &Substitution,
    ) -> Result<PlanId> {
        let element = AstElement::Method(binding.method);
        let provider = self.provider;
        self.with_cycle_detection(key, element, |this| {
            let method = provider.method(binding.method);
            let receiver = match &method.receiver {
                Some(receiver) => Some(this.resolve(context, &TypeKey::of(receiver.substitute(substitution)))?),
                None => None,
            };
            let parameters = this.resolve_params(context, &method.params, substitution, element)?;
            Ok(this.arena.alloc(Plan::Provides {
                class_name: context.class_name.clone(),
                method_name: method.name.clone(),
                accessor: binding.accessor.clone(),
                receiver,
                is_property: method.kind == MethodKind::Property,
                parameters,
            }))
        })
    }

    fn container_plan(
        &mut self,
        context: &Context,
        container: ContainerKind,
        args: &[MethodBinding],
    ) -> Result<PlanId> {
        let mut plans = Vec::with_capacity(args.len());
        for binding in args {
            let key = TypeKey::of(self.provider.method(binding.method).return_type.clone());
            let id = self.provides_plan(context, &key, binding, &Substitution::default())?;
            plans.push(PlanRef::new(key, id));
        }
        Ok(self.arena.alloc(Plan::Container {
            container,
            args: plans,
        }))
    }

    fn function_plan(&mut self, context: &Context, key: &TypeKey) -> Result<PlanId> {
        let Some((ret, params)) = key.ty.resolved().args.split_last() else {
            return Err(self.cannot_find(key));
        };
        if key.ty.is_type_alias() {
            let function = self
                .provider
                .find_functions(&key.ty.package, &key.ty.name)
                .into_iter()
                .find(|&f| self.annotations.is_inject(&self.provider.method(f).annotations));
            if let Some(function) = function {
                return self.named_function_plan(context, key, function, params);
            }
        }

        let frame = self.cycle_detector.delayed_construction();
        let args = self.named_args(params);
        let result = self.resolve(
            &context.with_args(args.iter().cloned()),
            &TypeKey::new(ret.clone(), key.qualifier.clone()),
        );
        self.cycle_detector.pop(frame);
        Ok(self.arena.alloc(Plan::Function {
            args: args.into_iter().map(|arg| arg.name).collect(),
            result: result?,
        }))
    }

    fn named_function_plan(
        &mut self,
        context: &Context,
        key: &TypeKey,
        function: MethodId,
        params: &[TypeDesc],
    ) -> Result<PlanId> {
        let element = AstElement::Method(function);
        let frame = self.cycle_detector.delayed_construction();
        let provider = self.provider;
        let result = self.with_cycle_detection(key, element, |this| {
            let ast = provider.method(function);
            let args = this.named_args(params);
            let inner = context.with_args(args.iter().cloned());
            let receiver = match &ast.receiver {
                Some(receiver) => Some(this.resolve(&inner, &TypeKey::of(receiver.clone()))?),
                None => None,
            };
            let parameters = this.resolve_params(&inner, &ast.params, &Substitution::default(), element)?;
            Ok(this.arena.alloc(Plan::NamedFunction {
                package: ast.package.clone(),
                name: ast.name.clone(),
                args: args.into_iter().map(|arg| arg.name).collect(),
                receiver,
                parameters,
            }))
        });
        self.cycle_detector.pop(frame);
        result
    }

    fn lazy_plan(&mut self, context: &Context, key: &TypeKey) -> Result<PlanId> {
        let Some(inner) = key.ty.resolved().args.first() else {
            return Err(self.cannot_find(key));
        };
        let frame = self.cycle_detector.delayed_construction();
        let result = self.resolve(context, &TypeKey::new(inner.clone(), key.qualifier.clone()));
        self.cycle_detector.pop(frame);
        Ok(self.arena.alloc(Plan::Lazy { result: result? }))
    }

    /// Matches `key` against the generic bindings in scope; exactly one
    /// binding must match.
    fn generic_plan(&mut self, context: &Context, key: &TypeKey) -> Result<Option<PlanId>> {
        let mut candidates: Vec<(MethodBinding, Substitution)> = Vec::new();
        for generic in context.catalog.generics() {
            if generic.qualifier != key.qualifier
                || candidates.iter().any(|(b, _)| b.method == generic.binding.method)
            {
                continue;
            }
            let mut substitution = Substitution::default();
            if !generic.pattern.match_pattern(&key.ty, &mut substitution) {
                continue;
            }
            let method = self.provider.method(generic.binding.method);
            if !self.bounds_satisfied(&method.type_params, &substitution) {
                continue;
            }
            candidates.push((generic.binding, substitution));
        }

        match candidates.len() {
            0 => Ok(None),
            1 => {
                let (binding, substitution) = candidates.remove(0);
                tracing::debug!(%key, "generic binding matched");
                self.method_plan(context, key, &binding, &substitution).map(Some)
            }
            _ => {
                let names: Vec<String> = candidates
                    .iter()
                    .map(|(b, _)| self.provider.to_trace(AstElement::Method(b.method)))
                    .collect();
                Err(ResolveError::Ambiguous {
                    key: key.clone(),
                    message: self.with_trace(format!(
                        "Ambiguous bindings for: {key}, candidates:\n{}",
                        names.join("\n")
                    )),
                    candidates: names,
                })
            }
        }
    }

    fn resolve_params(
        &mut self,
        context: &Context,
        params: &[AstParam],
        substitution: &Substitution,
        element: AstElement,
    ) -> Result<IndexMap<String, PlanRef>> {
        let mut out = IndexMap::with_capacity(params.len());
        for param in params {
            let ty = param.ty.substitute(substitution);
            let qualifier = self
                .annotations
                .qualifier(&param.annotations, &ty, element, self.messenger);
            let key = TypeKey::new(ty, qualifier);
            match self.resolve_or_none(context, &key)? {
                Some(plan) => {
                    let _ = out.insert(param.name.clone(), plan);
                }
                None if param.has_default => {}
                None => return Err(self.cannot_find(&key)),
            }
        }
        Ok(out)
    }

    fn named_args(&mut self, params: &[TypeDesc]) -> Vec<NamedArg> {
        params
            .iter()
            .enumerate()
            .map(|(index, ty)| NamedArg {
                ty: ty.clone(),
                name: self.arg_names.new_name(&format!("{ARG_NAME_PREFIX}{index}")),
            })
            .collect()
    }

    fn with_cycle_detection(
        &mut self,
        key: &TypeKey,
        element: AstElement,
        build: impl FnOnce(&mut Self) -> Result<PlanId>,
    ) -> Result<PlanId> {
        let id = match self.cycle_detector.check(key, element) {
            CycleResult::None(frame) => {
                let result = build(self);
                self.cycle_detector.pop(frame);
                result?
            }
            CycleResult::Cycle => {
                return Err(ResolveError::Cycle {
                    message: self.with_trace("Cycle detected"),
                    element: Some(element),
                });
            }
            CycleResult::Resolvable(name) => self.arena.alloc(Plan::LocalVar { name }),
        };
        Ok(self.maybe_late_init(key, id))
    }

    fn maybe_late_init(&mut self, key: &TypeKey, id: PlanId) -> PlanId {
        if matches!(
            self.arena.get(id),
            Plan::LocalVar { .. } | Plan::Lazy { .. } | Plan::Function { .. } | Plan::NamedFunction { .. }
        ) {
            return id;
        }
        match self.cycle_detector.hit_resolvable(key) {
            Some(name) => self.arena.alloc(Plan::LateInit {
                name,
                result: PlanRef::new(key.clone(), id),
            }),
            None => id,
        }
    }

    fn cannot_find(&self, key: &TypeKey) -> ResolveError {
        ResolveError::NotFound {
            key: key.clone(),
            message: self.with_trace(format!(
                "Cannot find an @Inject constructor or provider for: {key}"
            )),
        }
    }

    fn with_trace(&self, message: impl Into<String>) -> String {
        with_trace(message, &self.cycle_detector.trace(self.provider))
    }
}
