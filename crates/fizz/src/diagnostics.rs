//! Append-only sink for diagnostics collected during parsing and lowering.
//!
//! The parser and IR builder record every problem they detect here in
//! addition to returning an error, so a host embedding the interpreter can
//! display all diagnostics for an input rather than only the first failure.
//! The sink is append-only within one operation; the host clears it between
//! operations at its discretion.

use crate::error::ErrorKind;

/// A single recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    kind: ErrorKind,
    message: String,
}

impl Diagnostic {
    /// Returns the error kind this diagnostic was recorded under.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The diagnostics sink owned by the VM.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub(crate) fn record(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            kind,
            message: message.into(),
        });
    }

    /// Returns the recorded diagnostics, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discards all recorded diagnostics.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
