//! The flat error taxonomy shared by the parser, compiler, VM, and builtins.
//!
//! Every fault the interpreter can surface to the host is an [`Error`]: a
//! kind drawn from the fixed [`ErrorKind`] set plus a human-readable message.
//! There is no hierarchy and no recovery protocol; errors unwind to the
//! nearest host boundary and are returned from the public evaluation entry
//! points.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can produce an interpreter error.
pub type RunResult<T> = Result<T, Error>;

/// The kinds of errors the interpreter reports.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and
/// `Into<&'static str>` implementations. The string representation matches
/// the variant name exactly (e.g. `TypeError` -> "TypeError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    /// A value of the wrong variant reached an operation.
    TypeError,
    /// Caller and callee disagree on argument count.
    ArityError,
    /// Catch-all for operations with domain constraints (`nth` out of
    /// range, `struct-get` on a missing key, substring bounds).
    RuntimeError,
    /// A symbol dereference found no binding.
    SymbolNotFound,
    /// I/O failure while importing a module file.
    FileError,
    /// Malformed tokens, unbalanced parens, keyword misuse, or
    /// `define`/`import` outside module top level.
    SyntaxError,
    /// The memory manager's live-object limit was exceeded.
    OutOfMemory,
}

/// An interpreter error: a kind plus a formatted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates an `ArityError`.
    pub fn arity_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArityError, message)
    }

    /// Creates a `RuntimeError`.
    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    /// Creates a `SymbolNotFound` error for the given identifier.
    pub fn symbol_not_found(name: &str) -> Self {
        Self::new(ErrorKind::SymbolNotFound, format!("symbol {name} is not defined"))
    }

    /// Creates a `FileError`.
    pub fn file_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileError, message)
    }

    /// Creates a `SyntaxError`.
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message)
    }

    /// Creates an `OutOfMemory` error.
    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfMemory, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
