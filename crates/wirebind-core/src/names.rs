//! Collision-free identifier allocation.

use rustc_hash::FxHashSet;

/// Hands out identifiers that are unique within one allocator. A taken
/// suggestion gets `_` appended until it is free.
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
    taken: FxHashSet<String>,
}

impl NameAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as taken without allocating it.
    pub fn reserve(&mut self, name: &str) {
        let _ = self.taken.insert(name.to_string());
    }

    /// Allocates a name derived from `suggestion`.
    pub fn new_name(&mut self, suggestion: &str) -> String {
        let mut name = sanitize(suggestion);
        while !self.taken.insert(name.clone()) {
            name.push('_');
        }
        name
    }
}

fn sanitize(suggestion: &str) -> String {
    let mut out: String = suggestion
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collisions_get_suffixes() {
        let mut names = NameAllocator::new();
        assert_eq!(names.new_name("arg0"), "arg0");
        assert_eq!(names.new_name("arg0"), "arg0_");
        assert_eq!(names.new_name("arg0"), "arg0__");
    }

    #[test]
    fn reserved_names_are_skipped() {
        let mut names = NameAllocator::new();
        names.reserve("_foo");
        assert_eq!(names.new_name("_foo"), "_foo_");
    }

    #[test]
    fn invalid_characters_are_replaced() {
        let mut names = NameAllocator::new();
        assert_eq!(names.new_name("a-b"), "a_b");
        assert_eq!(names.new_name("1st"), "_1st");
        assert_eq!(names.new_name(""), "_");
    }
}
