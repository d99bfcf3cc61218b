//! Construction plans.
//!
//! Plans live in a [`PlanArena`] and refer to each other through
//! [`PlanRef`] slots holding a [`PlanId`]. Sharing a subtree means two slots
//! holding the same id, which is what the resolver's cache produces and what
//! the optimizer looks for.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use wirebind_common::error::Result;

use crate::accessor::Accessor;
use crate::ast::TypeDesc;
use crate::type_key::TypeKey;

/// Index of a plan node in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlanId(u32);

impl PlanId {
    /// Position in the arena.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A slot pointing at a plan node, tagged with the key it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRef {
    /// Requested key.
    pub key: TypeKey,
    /// Node that builds it.
    pub id: PlanId,
}

impl PlanRef {
    /// Creates a slot.
    pub const fn new(key: TypeKey, id: PlanId) -> Self {
        Self { key, id }
    }
}

/// Aggregate container built from contributors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContainerKind {
    /// `Set<T>` from `@IntoSet` members.
    Set,
    /// `Map<K, V>` from `@IntoMap` members.
    Map,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "setOf"),
            Self::Map => write!(f, "mapOf"),
        }
    }
}

/// One node of a construction plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Plan {
    /// Call a constructor.
    Constructor {
        /// Constructed type.
        ty: TypeDesc,
        /// Arguments by parameter name; defaulted parameters may be absent.
        parameters: IndexMap<String, PlanRef>,
        /// Whether arguments may be passed by name.
        supports_named_arguments: bool,
    },
    /// Call a binding member or accessor.
    Provides {
        /// Generated component class the call is made from.
        class_name: String,
        /// Member name.
        method_name: String,
        /// Path to the component declaring the member.
        accessor: Accessor,
        /// Extension receiver.
        receiver: Option<PlanRef>,
        /// Whether the member is a property.
        is_property: bool,
        /// Arguments by parameter name.
        parameters: IndexMap<String, PlanRef>,
    },
    /// Memoize `result` in the scope instance reached through `accessor`.
    Scoped {
        /// Memoization token.
        key: String,
        /// Path to the component owning the scope.
        accessor: Accessor,
        /// How to build the value on first use.
        result: PlanRef,
    },
    /// Build a set or map from contributors.
    Container {
        /// Container shape.
        container: ContainerKind,
        /// Contributors in declaration order.
        args: Vec<PlanRef>,
    },
    /// A lambda over `args` returning `result`.
    Function {
        /// Lambda parameter names.
        args: Vec<String>,
        /// Lambda body.
        result: PlanRef,
    },
    /// A lambda over `args` calling an injectable top-level function.
    NamedFunction {
        /// Package of the function.
        package: String,
        /// Function name.
        name: String,
        /// Lambda parameter names.
        args: Vec<String>,
        /// Extension receiver.
        receiver: Option<PlanRef>,
        /// Arguments by parameter name.
        parameters: IndexMap<String, PlanRef>,
    },
    /// Reference a singleton object.
    Object {
        /// Object type.
        ty: TypeDesc,
    },
    /// Reference an enclosing lambda parameter.
    Arg {
        /// Parameter name.
        name: String,
    },
    /// Reference a local variable bound by an enclosing `LateInit`.
    LocalVar {
        /// Variable name.
        name: String,
    },
    /// Defer `result` until first access.
    Lazy {
        /// Deferred value.
        result: PlanRef,
    },
    /// Declare `name`, build `result`, then assign it to `name`.
    LateInit {
        /// Variable name.
        name: String,
        /// Value whose construction refers back to `name`.
        result: PlanRef,
    },
}

impl Plan {
    /// Direct children, in rendering order.
    pub fn children(&self) -> Vec<&PlanRef> {
        match self {
            Self::Constructor { parameters, .. } => parameters.values().collect(),
            Self::Provides {
                receiver,
                parameters,
                ..
            }
            | Self::NamedFunction {
                receiver,
                parameters,
                ..
            } => receiver.iter().chain(parameters.values()).collect(),
            Self::Scoped { result, .. }
            | Self::Function { result, .. }
            | Self::Lazy { result }
            | Self::LateInit { result, .. } => vec![result],
            Self::Container { args, .. } => args.iter().collect(),
            Self::Object { .. } | Self::Arg { .. } | Self::LocalVar { .. } => Vec::new(),
        }
    }

    /// Direct children, mutably, in the same order as [`Plan::children`].
    pub fn children_mut(&mut self) -> Vec<&mut PlanRef> {
        match self {
            Self::Constructor { parameters, .. } => parameters.values_mut().collect(),
            Self::Provides {
                receiver,
                parameters,
                ..
            }
            | Self::NamedFunction {
                receiver,
                parameters,
                ..
            } => receiver.iter_mut().chain(parameters.values_mut()).collect(),
            Self::Scoped { result, .. }
            | Self::Function { result, .. }
            | Self::Lazy { result }
            | Self::LateInit { result, .. } => vec![result],
            Self::Container { args, .. } => args.iter_mut().collect(),
            Self::Object { .. } | Self::Arg { .. } | Self::LocalVar { .. } => Vec::new(),
        }
    }

    /// Short variant name.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Constructor { .. } => "Constructor",
            Self::Provides { .. } => "Provides",
            Self::Scoped { .. } => "Scoped",
            Self::Container { .. } => "Container",
            Self::Function { .. } => "Function",
            Self::NamedFunction { .. } => "NamedFunction",
            Self::Object { .. } => "Object",
            Self::Arg { .. } => "Arg",
            Self::LocalVar { .. } => "LocalVar",
            Self::Lazy { .. } => "Lazy",
            Self::LateInit { .. } => "LateInit",
        }
    }

    fn free_name(&self) -> Option<&str> {
        match self {
            Self::Arg { name } | Self::LocalVar { name } => Some(name),
            _ => None,
        }
    }

    fn bound_names(&self) -> &[String] {
        match self {
            Self::Function { args, .. } | Self::NamedFunction { args, .. } => args,
            Self::LateInit { name, .. } => std::slice::from_ref(name),
            _ => &[],
        }
    }
}

/// Owns every plan node built for one component.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanArena {
    nodes: Vec<Plan>,
    #[serde(skip)]
    free: Vec<Vec<String>>,
}

impl PlanArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node whose children are already in the arena.
    pub fn alloc(&mut self, plan: Plan) -> PlanId {
        let mut free: Vec<String> = plan.free_name().map(str::to_string).into_iter().collect();
        for child in plan.children() {
            if let Some(names) = self.free.get(child.id.index()) {
                for name in names {
                    if !free.contains(name) {
                        free.push(name.clone());
                    }
                }
            }
        }
        let bound = plan.bound_names();
        free.retain(|name| !bound.contains(name));

        let id = PlanId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(plan);
        self.free.push(free);
        id
    }

    /// The node `id`.
    pub fn get(&self, id: PlanId) -> &Plan {
        &self.nodes[id.index()]
    }

    /// The node `id`, mutably.
    pub fn get_mut(&mut self, id: PlanId) -> &mut Plan {
        &mut self.nodes[id.index()]
    }

    /// Returns true if the subtree under `id` references no lambda argument
    /// or local variable bound outside it, so it can be reused anywhere.
    ///
    /// Computed at allocation; not maintained across [`PlanArena::get_mut`].
    pub fn is_closed(&self, id: PlanId) -> bool {
        self.free.get(id.index()).is_none_or(Vec::is_empty)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A top-level accessor and the plan that implements it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    /// Member name.
    pub name: String,
    /// Declared return type.
    pub return_type: TypeDesc,
    /// Whether the member is a property.
    pub is_property: bool,
    /// Whether the member is synthesized and private.
    pub is_private: bool,
    /// Whether the member overrides an abstract declaration.
    pub is_override: bool,
    /// Whether the member suspends.
    pub is_suspend: bool,
    /// How to build the value.
    pub result: PlanRef,
}

/// Every top-level accessor of one component plus the arena they share.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanForest {
    /// Node storage.
    pub arena: PlanArena,
    /// Top-level accessors, synthesized private ones first.
    pub entries: Vec<PlanEntry>,
}

impl PlanForest {
    /// The entry named `name`.
    pub fn entry(&self, name: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// The node an entry's result slot points at.
    pub fn result_of(&self, name: &str) -> Option<&Plan> {
        self.entry(name).map(|entry| self.arena.get(entry.result.id))
    }

    /// Serializes the forest for a renderer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
