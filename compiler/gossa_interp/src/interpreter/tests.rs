use gossa_ast::{AstBuilder, Builtin};
use gossa_ir::StringInterner;
use gossa_ssa::{build_program, BuildConfig};
use gossa_types::Idx;
use pretty_assertions::assert_eq;

use super::*;
use crate::print_handler::silent_handler;

fn outcome(exit_code: i32, panics: Vec<PanicRecord>, fatal: Option<Fatal>) -> Outcome {
    Outcome {
        exit_code,
        panics,
        fatal,
        output: String::new(),
    }
}

#[test]
fn default_config() {
    let config = InterpreterConfig::default();
    assert!(!config.trace);
    assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    assert_eq!(config.seed, 0);
    assert_eq!(config.step_budget, None);
}

#[test]
fn clean_exit_has_no_failure() {
    let o = outcome(0, Vec::new(), None);
    assert!(o.success());
    assert_eq!(o.failure(), None);
}

#[test]
fn os_exit_code_is_not_a_failure_message() {
    let o = outcome(3, Vec::new(), None);
    assert!(!o.success());
    assert_eq!(o.failure(), None);
}

#[test]
fn panic_chain_lists_superseded_panics() {
    let o = outcome(
        2,
        vec![
            PanicRecord {
                message: "first".into(),
                recovered: true,
            },
            PanicRecord {
                message: "second".into(),
                recovered: false,
            },
        ],
        None,
    );
    assert_eq!(
        o.failure().as_deref(),
        Some("panic: first [recovered]\n\tpanic: second")
    );
}

#[test]
fn fatal_error_message() {
    let o = outcome(2, Vec::new(), Some(Fatal::Deadlock));
    assert_eq!(
        o.failure().as_deref(),
        Some("fatal error: all goroutines are asleep - deadlock!")
    );
}

#[test]
fn min_without_operands_is_an_error_not_a_panic() {
    let interner = StringInterner::shared();
    let mut pool = Pool::with_interner(interner.clone());
    let pkg = AstBuilder::new("main", interner).finish();
    let out = build_program(&pkg, &mut pool, &BuildConfig::default());
    let mut exec = InterpreterBuilder::new(&out.program, &pool)
        .print_handler(silent_handler())
        .build();
    let mut g = exec.new_goroutine();
    for b in [Builtin::Min, Builtin::Max] {
        assert!(exec.builtin(&mut g, b, &[], &[], Idx::INT).is_err());
    }
}
