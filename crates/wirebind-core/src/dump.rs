//! Text rendering of a plan forest.

use std::fmt::Write as _;

use rustc_hash::FxHashSet;

use crate::plan::{PlanForest, PlanId, PlanRef};

/// Renders every entry of `forest` as a tree under a `class` heading.
///
/// ```text
/// InjectApp
/// * bar: Bar
/// └ Constructor@2: Bar
///   └ Provides@4: Foo
/// ```
///
/// A node reachable twice is expanded the first time and marked with `*`
/// afterwards.
pub fn dump_graph(class: &str, forest: &PlanForest) -> String {
    let mut out = String::new();
    let mut seen = FxHashSet::default();
    let _ = writeln!(out, "{class}");
    for entry in &forest.entries {
        let _ = writeln!(out, "* {}: {}", entry.name, entry.return_type);
        render(&mut out, forest, &entry.result, "", true, &mut seen);
    }
    out
}

fn render(
    out: &mut String,
    forest: &PlanForest,
    slot: &PlanRef,
    prefix: &str,
    last: bool,
    seen: &mut FxHashSet<PlanId>,
) {
    let node = forest.arena.get(slot.id);
    let branch = if last { "└" } else { "├" };
    let first_visit = seen.insert(slot.id);
    let marker = if first_visit { "" } else { " *" };
    let _ = writeln!(
        out,
        "{prefix}{branch} {}@{}: {}{marker}",
        node.kind_name(),
        slot.id,
        slot.key
    );
    if !first_visit {
        return;
    }
    let children = node.children();
    let nested = format!("{prefix}{}", if last { "  " } else { "│ " });
    for (index, child) in children.iter().enumerate() {
        render(out, forest, child, &nested, index + 1 == children.len(), seen);
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::ast::TypeDesc;
    use crate::plan::{Plan, PlanEntry};
    use crate::type_key::TypeKey;

    fn key(name: &str) -> TypeKey {
        TypeKey::of(TypeDesc::declared("", name))
    }

    #[test]
    fn renders_branches_and_marks_repeats() {
        let mut forest = PlanForest::default();
        let foo = forest.arena.alloc(Plan::Object {
            ty: TypeDesc::declared("", "Foo"),
        });
        let mut parameters = IndexMap::new();
        let _ = parameters.insert("a".to_string(), PlanRef::new(key("Foo"), foo));
        let _ = parameters.insert("b".to_string(), PlanRef::new(key("Foo"), foo));
        let bar = forest.arena.alloc(Plan::Constructor {
            ty: TypeDesc::declared("", "Bar"),
            parameters,
            supports_named_arguments: true,
        });
        forest.entries.push(PlanEntry {
            name: "bar".into(),
            return_type: TypeDesc::declared("", "Bar"),
            is_property: true,
            is_private: false,
            is_override: true,
            is_suspend: false,
            result: PlanRef::new(key("Bar"), bar),
        });

        let dump = dump_graph("InjectApp", &forest);
        let expected = "InjectApp\n\
                        * bar: Bar\n\
                        └ Constructor@1: Bar\n  \
                        ├ Object@0: Foo\n  \
                        └ Object@0: Foo *\n";
        assert_eq!(dump, expected, "got: {dump}");
    }
}
