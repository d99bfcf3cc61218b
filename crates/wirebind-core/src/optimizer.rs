//! Shared-subtree hoisting.
//!
//! After resolution, a plan node reachable from two or more slots is built
//! once if it has children or is the result of two or more top-level
//! entries. When exactly one entry returns the node, that entry keeps it;
//! otherwise a private entry is synthesized for it. Every other slot is
//! pointed at a delegate calling that entry. Nested slots share one delegate
//! node, entry slots each get their own.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use wirebind_common::constants::PRIVATE_ACCESSOR_PREFIX;

use crate::accessor::Accessor;
use crate::names::NameAllocator;
use crate::plan::{Plan, PlanEntry, PlanForest, PlanId, PlanRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Entry(usize),
    Child { parent: PlanId, index: usize },
}

/// Hoists shared subtrees of `forest` into top-level entries.
///
/// `names` must already hold every member name of the component so
/// synthesized entries do not collide. Running the pass twice changes
/// nothing the second time.
pub fn optimize(forest: &mut PlanForest, class_name: &str, names: &mut NameAllocator) {
    let (order, slots) = collect_slots(forest);
    let mut hoisted = Vec::new();

    for id in order {
        let uses: Vec<Slot> = slots
            .iter()
            .filter(|(_, target)| *target == id)
            .map(|(slot, _)| *slot)
            .collect();
        let owners: Vec<usize> = uses
            .iter()
            .filter_map(|slot| match slot {
                Slot::Entry(index) => Some(*index),
                Slot::Child { .. } => None,
            })
            .collect();
        let is_leaf = forest.arena.get(id).children().is_empty();
        if uses.len() < 2 || (is_leaf && owners.len() < 2) || !forest.arena.is_closed(id) {
            continue;
        }

        let owner = match owners.as_slice() {
            [index] => Some(*index),
            _ => None,
        };
        let (method_name, is_property) = match owner {
            Some(index) => {
                let entry = &forest.entries[index];
                (entry.name.clone(), entry.is_property)
            }
            None => {
                let key = slot_ref(forest, uses[0]).key.clone();
                let name = names.new_name(&format!(
                    "{PRIVATE_ACCESSOR_PREFIX}{}",
                    key.ty.variable_name()
                ));
                tracing::debug!(%name, %key, "hoisting shared plan");
                hoisted.push(PlanEntry {
                    name: name.clone(),
                    return_type: key.ty.clone().without_qualifier(),
                    is_property: true,
                    is_private: true,
                    is_override: false,
                    is_suspend: false,
                    result: PlanRef::new(key, id),
                });
                (name, true)
            }
        };

        let delegate = Plan::Provides {
            class_name: class_name.to_string(),
            method_name,
            accessor: Accessor::EMPTY,
            receiver: None,
            is_property,
            parameters: IndexMap::new(),
        };
        let mut nested = None;
        for slot in uses {
            let target = match slot {
                Slot::Entry(index) if owner == Some(index) => continue,
                Slot::Entry(_) => forest.arena.alloc(delegate.clone()),
                Slot::Child { .. } => *nested.get_or_insert_with(|| forest.arena.alloc(delegate.clone())),
            };
            slot_mut(forest, slot).id = target;
        }
    }

    if !hoisted.is_empty() {
        let _ = forest.entries.splice(0..0, hoisted);
    }
}

/// Every slot reachable from the entries paired with its target, plus the
/// reachable nodes in pre-order. Each node's children are listed once.
fn collect_slots(forest: &PlanForest) -> (Vec<PlanId>, Vec<(Slot, PlanId)>) {
    let mut order = Vec::new();
    let mut slots = Vec::new();
    let mut seen = FxHashSet::default();
    let mut stack: Vec<PlanId> = Vec::new();

    for (index, entry) in forest.entries.iter().enumerate() {
        slots.push((Slot::Entry(index), entry.result.id));
        stack.push(entry.result.id);
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let children = forest.arena.get(id).children();
            for (child_index, child) in children.iter().enumerate() {
                slots.push((
                    Slot::Child {
                        parent: id,
                        index: child_index,
                    },
                    child.id,
                ));
            }
            stack.extend(children.iter().rev().map(|child| child.id));
        }
    }
    (order, slots)
}

fn slot_ref(forest: &PlanForest, slot: Slot) -> &PlanRef {
    match slot {
        Slot::Entry(index) => &forest.entries[index].result,
        Slot::Child { parent, index } => forest.arena.get(parent).children()[index],
    }
}

fn slot_mut(forest: &mut PlanForest, slot: Slot) -> &mut PlanRef {
    match slot {
        Slot::Entry(index) => &mut forest.entries[index].result,
        Slot::Child { parent, index } => forest.arena.get_mut(parent).children_mut().swap_remove(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeDesc;
    use crate::type_key::TypeKey;

    fn key(name: &str) -> TypeKey {
        TypeKey::of(TypeDesc::declared("", name))
    }

    fn constructor(forest: &mut PlanForest, name: &str, params: &[(&str, PlanId)]) -> PlanId {
        let parameters: IndexMap<String, PlanRef> = params
            .iter()
            .map(|(param, id)| ((*param).to_string(), PlanRef::new(key(&capitalize(param)), *id)))
            .collect();
        forest.arena.alloc(Plan::Constructor {
            ty: TypeDesc::declared("", name),
            parameters,
            supports_named_arguments: true,
        })
    }

    fn capitalize(name: &str) -> String {
        let mut chars = name.chars();
        chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect())
            .unwrap_or_default()
    }

    fn entry(name: &str, ty: &str, id: PlanId) -> PlanEntry {
        PlanEntry {
            name: name.into(),
            return_type: TypeDesc::declared("", ty),
            is_property: true,
            is_private: false,
            is_override: true,
            is_suspend: false,
            result: PlanRef::new(key(ty), id),
        }
    }

    fn shared_foo() -> PlanForest {
        let mut forest = PlanForest::default();
        let qux = constructor(&mut forest, "Qux", &[]);
        let foo = constructor(&mut forest, "Foo", &[("qux", qux)]);
        let bar = constructor(&mut forest, "Bar", &[("foo", foo)]);
        let baz = constructor(&mut forest, "Baz", &[("foo", foo)]);
        forest.entries = vec![entry("bar", "Bar", bar), entry("baz", "Baz", baz)];
        forest
    }

    fn delegate_name(forest: &PlanForest, parent: &str, param: &str) -> String {
        let Plan::Constructor { parameters, .. } = forest.result_of(parent).expect("entry") else {
            panic!("expected constructor");
        };
        match forest.arena.get(parameters[param].id) {
            Plan::Provides { method_name, .. } => method_name.clone(),
            other => panic!("expected delegate, got {}", other.kind_name()),
        }
    }

    #[test]
    fn shared_nested_node_gets_private_entry() {
        let mut forest = shared_foo();
        let mut names = NameAllocator::new();
        optimize(&mut forest, "InjectApp", &mut names);

        let first = &forest.entries[0];
        assert_eq!(first.name, "_foo");
        assert!(first.is_private);
        assert!(!first.is_override);
        assert!(matches!(forest.result_of("_foo"), Some(Plan::Constructor { .. })));
        assert_eq!(delegate_name(&forest, "bar", "foo"), "_foo");
        assert_eq!(delegate_name(&forest, "baz", "foo"), "_foo");
    }

    #[test]
    fn top_level_owner_is_reused() {
        let mut forest = PlanForest::default();
        let qux = constructor(&mut forest, "Qux", &[]);
        let foo = constructor(&mut forest, "Foo", &[("qux", qux)]);
        let bar = constructor(&mut forest, "Bar", &[("foo", foo)]);
        forest.entries = vec![entry("a", "Foo", foo), entry("bar", "Bar", bar)];
        optimize(&mut forest, "InjectApp", &mut NameAllocator::new());

        assert_eq!(forest.entries.len(), 2);
        assert_eq!(forest.entries[0].result.id, foo);
        assert_eq!(delegate_name(&forest, "bar", "foo"), "a");
    }

    #[test]
    fn leaf_returned_by_two_entries_gets_private_entry() {
        let mut forest = PlanForest::default();
        let foo = constructor(&mut forest, "Foo", &[]);
        forest.entries = vec![entry("a", "Foo", foo), entry("b", "Foo", foo)];
        let mut names = NameAllocator::new();
        optimize(&mut forest, "InjectApp", &mut names);

        let names: Vec<&str> = forest.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["_foo", "a", "b"]);
        assert_eq!(forest.entries[0].result.id, foo);
        for accessor in ["a", "b"] {
            match forest.result_of(accessor) {
                Some(Plan::Provides { method_name, .. }) => assert_eq!(method_name, "_foo"),
                other => panic!("expected delegate, got {other:?}"),
            }
        }
        assert_ne!(forest.entries[1].result.id, forest.entries[2].result.id);

        let nodes = forest.arena.len();
        optimize(&mut forest, "InjectApp", &mut NameAllocator::new());
        assert_eq!(forest.entries.len(), 3);
        assert_eq!(forest.arena.len(), nodes);
    }

    #[test]
    fn shared_leaves_stay_inline() {
        let mut forest = PlanForest::default();
        let qux = constructor(&mut forest, "Qux", &[]);
        let bar = constructor(&mut forest, "Bar", &[("qux", qux)]);
        let baz = constructor(&mut forest, "Baz", &[("qux", qux)]);
        forest.entries = vec![entry("bar", "Bar", bar), entry("baz", "Baz", baz)];
        let before = forest.arena.len();
        optimize(&mut forest, "InjectApp", &mut NameAllocator::new());

        assert_eq!(forest.entries.len(), 2);
        assert_eq!(forest.arena.len(), before);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut forest = shared_foo();
        let mut names = NameAllocator::new();
        optimize(&mut forest, "InjectApp", &mut names);
        let entries = forest.entries.clone();
        let nodes = forest.arena.len();

        optimize(&mut forest, "InjectApp", &mut names);
        assert_eq!(forest.entries, entries);
        assert_eq!(forest.arena.len(), nodes);
    }

    #[test]
    fn synthesized_names_avoid_members() {
        let mut forest = shared_foo();
        let mut names = NameAllocator::new();
        names.reserve("_foo");
        optimize(&mut forest, "InjectApp", &mut names);
        assert_eq!(forest.entries[0].name, "_foo_");
    }
}
