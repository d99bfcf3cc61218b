//! Construction cycle detection.
//!
//! # Model
//!
//! The detector keeps a stack of the source elements currently being
//! constructed, interleaved with [`Entry::Delayed`] markers pushed whenever
//! resolution enters a deferred wrapper (a function or `Lazy`). Re-entering
//! an element that is already on the stack means one of two things:
//!
//! 1. There is a `Delayed` marker above the earlier occurrence. The value is
//!    only needed after construction completes, so the cycle is broken with a
//!    local variable that a `LateInit` plan binds once the outer frame
//!    finishes. The detector returns [`CycleResult::Resolvable`] and records
//!    the key as pending until [`CycleDetector::hit_resolvable`] claims it.
//! 2. There is no such marker. Construction would never terminate, and the
//!    detector returns [`CycleResult::Cycle`].
//!
//! # Frames
//!
//! [`CycleDetector::check`] and [`CycleDetector::delayed_construction`]
//! hand back a [`Frame`] recording the stack height before the push. Passing
//! it to [`CycleDetector::pop`] drops the entry together with anything pushed
//! above it, so an early return through `?` cannot leave stale markers that
//! would later turn a real cycle into a "resolvable" one.

use crate::ast::{AstElement, AstProvider};
use crate::type_key::TypeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Element(AstElement),
    Delayed,
}

/// Stack height to restore when a frame closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Frame(usize);

/// Outcome of [`CycleDetector::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResult {
    /// The element was pushed; pop the frame when construction finishes.
    None(Frame),
    /// A cycle with no deferral point.
    Cycle,
    /// A deferred cycle; reference the value through this local variable.
    Resolvable(String),
}

/// A deferred cycle waiting for its outer frame to bind the variable.
#[derive(Debug, Clone)]
struct Pending {
    key: TypeKey,
    name: String,
    /// Elements on the stack when the cycle was found, oldest first.
    path: Vec<AstElement>,
}

/// Tracks elements under construction. See the module docs.
#[derive(Debug, Default)]
pub struct CycleDetector {
    entries: Vec<Entry>,
    resolving: Vec<Pending>,
}

impl CycleDetector {
    /// Creates an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `element` for re-entry and pushes it if it is not on the stack.
    pub fn check(&mut self, key: &TypeKey, element: AstElement) -> CycleResult {
        let height = self.entries.len();
        let Some(position) = self
            .entries
            .iter()
            .rposition(|entry| *entry == Entry::Element(element))
        else {
            self.entries.push(Entry::Element(element));
            return CycleResult::None(Frame(height));
        };
        if !self.entries[position + 1..].contains(&Entry::Delayed) {
            return CycleResult::Cycle;
        }
        if let Some(pending) = self.resolving.iter().find(|pending| pending.key == *key) {
            return CycleResult::Resolvable(pending.name.clone());
        }
        let name = key.ty.variable_name();
        tracing::debug!(%key, %name, "deferred cycle");
        let mut path = self.elements().collect::<Vec<_>>();
        path.push(element);
        self.resolving.push(Pending {
            key: key.clone(),
            name: name.clone(),
            path,
        });
        CycleResult::Resolvable(name)
    }

    /// Marks entry into a deferred wrapper.
    pub fn delayed_construction(&mut self) -> Frame {
        let height = self.entries.len();
        self.entries.push(Entry::Delayed);
        Frame(height)
    }

    /// Closes a frame, dropping its entry and everything above it.
    pub fn pop(&mut self, frame: Frame) {
        self.entries.truncate(frame.0);
    }

    /// Claims the pending local variable for `key`.
    ///
    /// Cycles close in stack order, which need not match the order they were
    /// found in, so any pending entry for `key` may be claimed.
    pub fn hit_resolvable(&mut self, key: &TypeKey) -> Option<String> {
        let position = self.resolving.iter().rposition(|pending| pending.key == *key)?;
        Some(self.resolving.remove(position).name)
    }

    /// Returns true if a deferred cycle was never closed.
    pub fn has_pending(&self) -> bool {
        !self.resolving.is_empty()
    }

    /// Forgets all state.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.resolving.clear();
    }

    /// Elements on the stack, most recent first, one per line.
    pub fn trace(&self, provider: &dyn AstProvider) -> String {
        render(provider, self.elements())
    }

    /// Trace of the oldest deferred cycle never closed, as it stood when the
    /// cycle was found.
    pub fn pending_trace(&self, provider: &dyn AstProvider) -> Option<String> {
        self.resolving
            .first()
            .map(|pending| render(provider, pending.path.iter().copied()))
    }

    fn elements(&self) -> impl Iterator<Item = AstElement> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Element(element) => Some(*element),
            Entry::Delayed => None,
        })
    }
}

fn render(provider: &dyn AstProvider, elements: impl Iterator<Item = AstElement>) -> String {
    elements
        .collect::<Vec<_>>()
        .iter()
        .rev()
        .map(|element| provider.to_trace(*element))
        .collect::<Vec<_>>()
        .join("\n")
}
