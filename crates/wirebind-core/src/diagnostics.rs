//! Diagnostic collection.

use serde::Serialize;
use wirebind_common::types::Severity;

use crate::ast::AstElement;

/// A user-facing problem or note anchored to a source element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Whether this fails generation.
    pub severity: Severity,
    /// Rendered message.
    pub message: String,
    /// Element the message points at.
    pub element: Option<AstElement>,
}

/// Collects diagnostics so one pass can report every problem it finds.
/// Identical diagnostics are recorded once.
#[derive(Debug, Default)]
pub struct Messenger {
    diagnostics: Vec<Diagnostic>,
}

impl Messenger {
    /// Creates an empty messenger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn error(&mut self, message: impl Into<String>, element: Option<AstElement>) {
        self.report(Severity::Error, message.into(), element);
    }

    /// Records a warning.
    pub fn warn(&mut self, message: impl Into<String>, element: Option<AstElement>) {
        self.report(Severity::Warning, message.into(), element);
    }

    fn report(&mut self, severity: Severity, message: String, element: Option<AstElement>) {
        let diagnostic = Diagnostic {
            severity,
            message,
            element,
        };
        if self.diagnostics.contains(&diagnostic) {
            return;
        }
        tracing::debug!(%severity, ?element, text = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Returns true if any error was recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Everything recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Takes the recorded diagnostics, leaving the messenger empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
