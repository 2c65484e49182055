//! Error types for the canopy-formula crate.

use std::backtrace::Backtrace;
use std::fmt;

/// Error type for formula compilation and evaluation.
///
/// Three classes exist, mirrored by the `is_xxx()` helpers:
/// - syntax: the text is not a single arithmetic expression
/// - validation: the text uses a construct, function, or variable that is
///   not allowed or not supplied
/// - domain: an operation has no real result for its inputs
///
/// Why: callers report formula problems verbatim to end users, and need to
/// tell a malformed formula apart from one that is fine but was fed
/// out-of-range measurements.
#[derive(Debug)]
pub struct FormulaError {
    kind: FormulaErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
pub(crate) enum FormulaErrorKind {
    /// Malformed text at the given byte offset.
    Syntax { position: usize, message: String },
    /// A recognized but forbidden construct such as `=` or `for`.
    Disallowed { position: usize, construct: String },
    /// A call to a function outside the allow-list.
    UnknownFunction { position: usize, name: String },
    /// A call whose target is not a bare function name.
    IndirectCall { position: usize },
    /// An allow-listed function name used as a value.
    FunctionAsValue { position: usize, name: String },
    /// An allow-listed function called with the wrong number of arguments.
    Arity {
        position: usize,
        name: &'static str,
        expected: &'static str,
        found: usize,
    },
    /// A variable missing from the evaluation environment.
    UnknownVariable { name: String },
    /// An operation without a real result.
    Domain {
        operation: &'static str,
        detail: String,
    },
}

impl FormulaError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: FormulaErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::new(FormulaErrorKind::Syntax {
            position,
            message: message.into(),
        })
    }

    pub(crate) fn disallowed(
        position: usize,
        construct: impl Into<String>,
    ) -> Self {
        Self::new(FormulaErrorKind::Disallowed {
            position,
            construct: construct.into(),
        })
    }

    pub(crate) fn domain(
        operation: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(FormulaErrorKind::Domain {
            operation,
            detail: detail.into(),
        })
    }

    /// Returns true if the formula text could not be parsed.
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, FormulaErrorKind::Syntax { .. })
    }

    /// Returns true if the formula uses something outside the allowed
    /// grammar, function set, or supplied variables.
    ///
    /// Why: validation failures mean the formula itself (or the variables
    /// offered to it) must change; retrying with other measurements is
    /// pointless.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind,
            FormulaErrorKind::Disallowed { .. }
                | FormulaErrorKind::UnknownFunction { .. }
                | FormulaErrorKind::IndirectCall { .. }
                | FormulaErrorKind::FunctionAsValue { .. }
                | FormulaErrorKind::Arity { .. }
                | FormulaErrorKind::UnknownVariable { .. }
        )
    }

    /// Returns true if an operation had no real result, e.g. `log(0)`.
    pub fn is_domain(&self) -> bool {
        matches!(self.kind, FormulaErrorKind::Domain { .. })
    }

    /// Returns the byte offset in the source text the error points at, if
    /// the error is tied to a location.
    pub fn position(&self) -> Option<usize> {
        match &self.kind {
            FormulaErrorKind::Syntax { position, .. }
            | FormulaErrorKind::Disallowed { position, .. }
            | FormulaErrorKind::UnknownFunction { position, .. }
            | FormulaErrorKind::IndirectCall { position }
            | FormulaErrorKind::FunctionAsValue { position, .. }
            | FormulaErrorKind::Arity { position, .. } => Some(*position),
            FormulaErrorKind::UnknownVariable { .. }
            | FormulaErrorKind::Domain { .. } => None,
        }
    }

    /// Returns the offending name or construct, if there is one.
    pub fn offending(&self) -> Option<&str> {
        match &self.kind {
            FormulaErrorKind::Disallowed { construct, .. } => Some(construct),
            FormulaErrorKind::UnknownFunction { name, .. }
            | FormulaErrorKind::FunctionAsValue { name, .. }
            | FormulaErrorKind::UnknownVariable { name } => Some(name),
            FormulaErrorKind::Arity { name, .. } => Some(name),
            FormulaErrorKind::Domain { operation, .. } => Some(operation),
            FormulaErrorKind::Syntax { .. }
            | FormulaErrorKind::IndirectCall { .. } => None,
        }
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for FormulaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaErrorKind::Syntax { position, message } => {
                write!(f, "syntax error at offset {position}: {message}")
            }
            FormulaErrorKind::Disallowed {
                position,
                construct,
            } => {
                write!(f, "{construct} is not allowed (offset {position})")
            }
            FormulaErrorKind::UnknownFunction { position, name } => {
                write!(
                    f,
                    "function `{name}` is not allowed (offset {position})"
                )
            }
            FormulaErrorKind::IndirectCall { position } => {
                write!(
                    f,
                    "only named functions can be called (offset {position})"
                )
            }
            FormulaErrorKind::FunctionAsValue { position, name } => {
                write!(
                    f,
                    "function `{name}` must be called, not used as a value \
                     (offset {position})"
                )
            }
            FormulaErrorKind::Arity {
                position,
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "`{name}` takes {expected} argument(s), got {found} \
                     (offset {position})"
                )
            }
            FormulaErrorKind::UnknownVariable { name } => {
                write!(f, "unknown variable `{name}`")
            }
            FormulaErrorKind::Domain { operation, detail } => {
                write!(f, "math domain error in `{operation}`: {detail}")
            }
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only the summary; formula errors are shown to end users and the
        // backtrace stays available through `backtrace()`.
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for FormulaError {}
