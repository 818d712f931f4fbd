//! # Diagnostic Reporting
//!
//! Structured diagnostics produced by semantic analysis:
//! - A closed set of error kinds, each with a stable code
//! - A primary span (the whole offending construct) and a focus span
//! - Ordered string parameters (callee name, expected and actual counts,
//!   rendered types) for an external reporter to format or translate
//! - JSON serialization of collected diagnostics
//!
//! Every diagnostic is local: the analyzer records it and keeps going with
//! `never` substituted for the failed construct.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::source::Span;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// Internal inconsistency in the analyzer
    Ice,
    Error,
    Warning,
    Note,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Ice => write!(f, "internal compiler error"),
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Note => write!(f, "note"),
        }
    }
}

/// Diagnostic error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiagnosticCode(pub &'static str);

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Codes for every [`ErrorKind`]
pub mod codes {
    use super::DiagnosticCode;

    pub const E0001: DiagnosticCode = DiagnosticCode("E0001"); // Undefined variable
    pub const E0002: DiagnosticCode = DiagnosticCode("E0002"); // Wrong argument count
    pub const E0003: DiagnosticCode = DiagnosticCode("E0003"); // Cannot call value
    pub const E0004: DiagnosticCode = DiagnosticCode("E0004"); // Method not found
    pub const E0005: DiagnosticCode = DiagnosticCode("E0005"); // Static method not found
    pub const E0006: DiagnosticCode = DiagnosticCode("E0006"); // No such operator
    pub const E0007: DiagnosticCode = DiagnosticCode("E0007"); // Void value used
    pub const E0008: DiagnosticCode = DiagnosticCode("E0008"); // Array key must be a number
    pub const E0009: DiagnosticCode = DiagnosticCode("E0009"); // Value not indexable
    pub const E0010: DiagnosticCode = DiagnosticCode("E0010"); // Specialization too deep

    pub const E0900: DiagnosticCode = DiagnosticCode("E0900"); // Unification conflict
}

/// Kinds of problems the analyzer reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// `[name]`
    UndefinedVariable,
    /// `[callee, expected, actual, rendered signature]`
    WrongArgumentCount,
    /// `[rendered callee]`
    CannotCallValue,
    /// `[receiver type, method, rendered arguments]`
    MethodNotFound,
    /// `[class, method, rendered arguments]`
    StaticMethodNotFound,
    /// `[operator, rendered operand types]`
    NoSuchOperator,
    /// `[what received the void value]`
    CantAssignVoid,
    /// `[key type]`
    ArrayAccessKeyMustBeNumber,
    /// `[value type]`
    ValueNotIndexable,
    /// `[function, depth]`
    SpecializationTooDeep,
    /// `[template, bound type, attempted type]`
    UnificationConflict,
}

impl ErrorKind {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ErrorKind::UndefinedVariable => codes::E0001,
            ErrorKind::WrongArgumentCount => codes::E0002,
            ErrorKind::CannotCallValue => codes::E0003,
            ErrorKind::MethodNotFound => codes::E0004,
            ErrorKind::StaticMethodNotFound => codes::E0005,
            ErrorKind::NoSuchOperator => codes::E0006,
            ErrorKind::CantAssignVoid => codes::E0007,
            ErrorKind::ArrayAccessKeyMustBeNumber => codes::E0008,
            ErrorKind::ValueNotIndexable => codes::E0009,
            ErrorKind::SpecializationTooDeep => codes::E0010,
            ErrorKind::UnificationConflict => codes::E0900,
        }
    }

    pub fn level(&self) -> DiagnosticLevel {
        match self {
            ErrorKind::UnificationConflict => DiagnosticLevel::Ice,
            _ => DiagnosticLevel::Error,
        }
    }
}

/// One structured diagnostic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    /// Whole offending construct
    pub span: Span,
    /// Sub-span the reporter should underline
    pub focus: Span,
    pub parameters: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            level: kind.level(),
            code: kind.code(),
            span,
            focus: span,
            parameters: Vec::new(),
        }
    }

    pub fn with_focus(mut self, focus: Span) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.level, DiagnosticLevel::Error | DiagnosticLevel::Ice)
    }

    fn parameter(&self, index: usize) -> &str {
        self.parameters.get(index).map(String::as_str).unwrap_or("?")
    }

    /// Plain English rendering, mostly for logs and test failures
    pub fn message(&self) -> String {
        let p = |i| self.parameter(i);
        match self.kind {
            ErrorKind::UndefinedVariable => format!("undefined variable `{}`", p(0)),
            ErrorKind::WrongArgumentCount => format!(
                "`{}` expects {} argument(s), {} given",
                p(0),
                p(1),
                p(2)
            ),
            ErrorKind::CannotCallValue => format!("`{}` is not callable", p(0)),
            ErrorKind::MethodNotFound => {
                format!("no method `{}.{}({})`", p(0), p(1), p(2))
            }
            ErrorKind::StaticMethodNotFound => {
                format!("no static method `{}::{}({})`", p(0), p(1), p(2))
            }
            ErrorKind::NoSuchOperator => format!("no operator `{}` for ({})", p(0), p(1)),
            ErrorKind::CantAssignVoid => format!("{} cannot receive a void value", p(0)),
            ErrorKind::ArrayAccessKeyMustBeNumber => {
                format!("array key must be a number, found `{}`", p(0))
            }
            ErrorKind::ValueNotIndexable => format!("value of type `{}` cannot be indexed", p(0)),
            ErrorKind::SpecializationTooDeep => format!(
                "specialization of `{}` nested deeper than {} levels",
                p(0),
                p(1)
            ),
            ErrorKind::UnificationConflict => format!(
                "template `{}` bound to `{}` cannot be rebound to `{}`",
                p(0),
                p(1),
                p(2)
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} at {}..{}",
            self.level,
            self.code,
            self.message(),
            self.span.start,
            self.span.end
        )
    }
}

/// Diagnostic collector
#[derive(Debug)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    /// Errors past this cap are counted but not stored
    max_errors: usize,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::with_max_errors(usize::MAX)
    }

    pub fn with_max_errors(max_errors: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
            max_errors,
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.error_count += 1;
            if self.error_count > self.max_errors {
                log::trace!("[DIAGNOSTICS] dropping {} past the error cap", diagnostic);
                return;
            }
        }
        log::debug!("[DIAGNOSTICS] {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Start a diagnostic of `kind` over `span`
    pub fn report(&mut self, kind: ErrorKind, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder::new(self, Diagnostic::new(kind, span))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// All diagnostics of the given kind, in emission order
    pub fn of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.diagnostics)
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
    }
}

impl Default for DiagnosticCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing diagnostics fluently
pub struct DiagnosticBuilder<'a> {
    collector: &'a mut DiagnosticCollector,
    diagnostic: Diagnostic,
}

impl<'a> DiagnosticBuilder<'a> {
    fn new(collector: &'a mut DiagnosticCollector, diagnostic: Diagnostic) -> Self {
        Self { collector, diagnostic }
    }

    pub fn focus(mut self, focus: Span) -> Self {
        self.diagnostic.focus = focus;
        self
    }

    pub fn param(mut self, parameter: impl Into<String>) -> Self {
        self.diagnostic.parameters.push(parameter.into());
        self
    }

    pub fn emit(self) {
        self.collector.add(self.diagnostic);
    }
}
