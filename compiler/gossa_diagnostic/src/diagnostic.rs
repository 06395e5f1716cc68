use std::fmt;

use gossa_ir::Span;

use crate::ErrorCode;

/// A labeled span with a message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    /// Create a primary label (the main error location).
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    /// Create a secondary label (related context).
    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            is_primary: false,
        }
    }
}

/// A diagnostic produced while building a CFG or an SSA function.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    /// Error code for searchability.
    pub code: ErrorCode,
    /// Main error message.
    pub message: String,
    /// Labeled spans showing where the error occurred.
    pub labels: Vec<Label>,
    /// Additional notes providing context.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(code: ErrorCode) -> Self {
        Diagnostic {
            code,
            message: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Set the main message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add a primary label at the error location.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label for context.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    /// Add a note providing additional context.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Get the primary span (first primary label's span).
    pub fn primary_span(&self) -> Option<Span> {
        self.labels.iter().find(|l| l.is_primary).map(|l| l.span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error [{}]: {}", self.code, self.message)?;

        for label in &self.labels {
            let marker = if label.is_primary { "-->" } else { "   " };
            write!(f, "\n  {} {}: {}", marker, label.span, label.message)?;
        }

        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }

        Ok(())
    }
}

/// Create an "undefined label" diagnostic.
pub fn undefined_label(span: Span, keyword: &str, label: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1001)
        .with_message(format!("label {label} not defined"))
        .with_label(span, format!("`{keyword} {label}` refers to a missing label"))
}

/// Create a "duplicate label" diagnostic.
pub fn duplicate_label(span: Span, first: Span, label: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1002)
        .with_message(format!("label {label} already defined"))
        .with_label(span, "redefined here")
        .with_secondary_label(first, "first defined here")
}

/// Create a "break outside loop/switch/select" diagnostic.
pub fn break_outside(span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1003)
        .with_message("break is not in a loop, switch, or select")
        .with_label(span, "break here")
}

/// Create a "continue outside loop" diagnostic.
pub fn continue_outside(span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1004)
        .with_message("continue is not in a loop")
        .with_label(span, "continue here")
}

/// Create an "invalid branch label" diagnostic: `break L` or `continue L`
/// where `L` exists but does not label an enclosing statement of the right
/// kind.
pub fn invalid_branch_label(span: Span, keyword: &str, label: &str) -> Diagnostic {
    let wanted = if keyword == "continue" {
        "an enclosing for statement"
    } else {
        "an enclosing for, switch, or select statement"
    };
    Diagnostic::error(ErrorCode::E1006)
        .with_message(format!("invalid {keyword} label {label}"))
        .with_label(span, format!("label does not name {wanted}"))
}

/// Create a "misplaced fallthrough" diagnostic.
pub fn misplaced_fallthrough(span: Span, reason: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1005)
        .with_message(format!("fallthrough statement out of place: {reason}"))
        .with_label(span, "fallthrough here")
}

/// Create an "unsupported construct" diagnostic.
#[cold]
pub fn unsupported(span: Span, what: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9001)
        .with_message(format!("unsupported construct: {what}"))
        .with_label(span, "not lowered")
        .with_note("the construct is replaced by a panic at run time")
}

/// Create a "malformed input" diagnostic for a front-end invariant the
/// builder relies on.
#[cold]
pub fn malformed(span: Span, what: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9002)
        .with_message(format!("malformed input: {what}"))
        .with_label(span, "here")
}

/// Create an "invalid SSA" diagnostic from a sanity-check failure.
#[cold]
pub fn invalid_ssa(span: Span, function: &str, problem: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9003)
        .with_message(format!("invalid SSA in {function}: {problem}"))
        .with_label(span, "in this function")
}
