use std::fmt;

/// Error codes for build-time diagnostics.
///
/// Format: E#### where the first digit names the category:
/// - E1xxx: control-flow structure (labels, branch statements)
/// - E9xxx: internal errors and unsupported constructs
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ErrorCode {
    // Control-flow errors (E1xxx)
    /// `goto`, `break` or `continue` names a label that is not in scope
    E1001,
    /// A label is declared twice in the same function
    E1002,
    /// `break` outside any `for`, `switch` or `select`
    E1003,
    /// `continue` outside any `for`
    E1004,
    /// `fallthrough` that is not the last statement of a non-final case
    E1005,
    /// Labeled `break`/`continue` whose label does not name a suitable
    /// enclosing statement
    E1006,

    // Internal errors (E9xxx)
    /// Construct the builder does not lower
    E9001,
    /// Malformed input tree (front-end invariant violated)
    E9002,
    /// Built SSA failed the sanity checker
    E9003,
}

impl ErrorCode {
    /// Control-flow structure errors.
    pub fn is_control_flow_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E1001
                | ErrorCode::E1002
                | ErrorCode::E1003
                | ErrorCode::E1004
                | ErrorCode::E1005
                | ErrorCode::E1006
        )
    }

    /// Get the error code as a string (e.g., "E1001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
            ErrorCode::E9003 => "E9003",
        }
    }

    /// One-line description, used as a note on rendered diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "undefined label",
            ErrorCode::E1002 => "duplicate label",
            ErrorCode::E1003 => "break outside loop, switch or select",
            ErrorCode::E1004 => "continue outside loop",
            ErrorCode::E1005 => "misplaced fallthrough",
            ErrorCode::E1006 => "invalid branch label",
            ErrorCode::E9001 => "unsupported construct",
            ErrorCode::E9002 => "malformed input",
            ErrorCode::E9003 => "invalid SSA",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E1001.to_string(), "E1001");
        assert_eq!(ErrorCode::E9001.to_string(), "E9001");
    }

    #[test]
    fn test_category() {
        assert!(ErrorCode::E1005.is_control_flow_error());
        assert!(!ErrorCode::E9002.is_control_flow_error());
    }
}
