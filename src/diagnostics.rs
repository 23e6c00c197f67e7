//! Non-fatal findings collected during a generation run.
//!
//! Every finding is logged at its severity as soon as it is recorded and kept in a
//! [`Diagnostics`] list so callers (and tests) can inspect what was dropped or overwritten.

use log::{error, warn};
use std::fmt;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing beyond the immediate item was lost
    Warning,
    /// A declaration, field, parameter or operation was dropped
    Error,
}

/// A single finding attached to the declaration it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// The declaration, field or operation the finding is about
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Ordered collection of findings for one run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and logs a warning.
    pub fn warn(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, subject.into(), message.into());
    }

    /// Records and logs an error that dropped an item.
    pub fn error(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, subject.into(), message.into());
    }

    fn push(&mut self, severity: Severity, subject: String, message: String) {
        let diagnostic = Diagnostic {
            severity,
            subject,
            message,
        };
        match severity {
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Error => error!("{}", diagnostic),
        }
        self.items.push(diagnostic);
    }

    /// Appends findings recorded elsewhere; they were logged when first recorded.
    pub fn append(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether any recorded finding mentions `needle` in its message.
    pub fn contains(&self, needle: &str) -> bool {
        self.items.iter().any(|d| d.message.contains(needle))
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
