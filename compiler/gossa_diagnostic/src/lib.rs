//! Structured diagnostics for the build-time phases.
//!
//! The CFG utility and the SSA builder never abort on malformed control flow.
//! They record a [`Diagnostic`] and keep going, so a caller always receives a
//! complete (possibly partially dead) graph together with the list of
//! problems found while building it.
//!
//! - Error codes for searchability
//! - Primary span (where it went wrong)
//! - Context labels and notes

mod diagnostic;
mod error_code;
pub mod queue;

pub use diagnostic::{
    break_outside, continue_outside, duplicate_label, invalid_branch_label, invalid_ssa, malformed,
    misplaced_fallthrough, undefined_label, unsupported, Diagnostic, Label,
};
pub use error_code::ErrorCode;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
