//! End-to-end integration tests: normalize, solve, and verify the two demo
//! data structures in `src/fixtures.rs` against a real Z3 backend.

use heal_verify::config::VerifierOptions;
use heal_verify::encoder::z3_backend::Z3Backend;
use heal_verify::fixtures;
use heal_verify::verifier::{FunctionVerdict, Verifier};

fn verifier_for(
    program: heal_verify::ast::Program,
    config: heal_verify::config::SolverConfig,
) -> Verifier<Z3Backend> {
    Verifier::new(program, config, VerifierOptions::default(), Z3Backend::new)
}

#[test]
fn treiber_stack_push_normalizes_cleanly() {
    let mut verifier = verifier_for(fixtures::treiber_stack_program(), fixtures::treiber_stack_config());
    let normalized = verifier.normalized().expect("CAS/loop desugaring should succeed");
    assert_eq!(normalized.interface_functions().count(), 1);
}

#[test]
fn treiber_stack_push_fails_under_a_strict_malloc_invariant() {
    let mut verifier = verifier_for(fixtures::treiber_stack_program(), fixtures::treiber_stack_strict_config());
    let result = verifier.verify_result().expect("the driver itself should not error");
    assert!(!result.is_linearizable());
    let push = result.functions.iter().find(|f| f.function == "push").unwrap();
    assert!(matches!(
        &push.verdict,
        FunctionVerdict::VerificationError(heal_verify::VerificationError::InvariantViolation { .. })
    ));
}

#[test]
fn dereference_cas_program_normalizes_cleanly() {
    let mut verifier = verifier_for(fixtures::dereference_cas_program(), fixtures::dereference_cas_config());
    let normalized = verifier.normalized().expect("a dereference-destination CAS should desugar, not panic");
    assert_eq!(normalized.interface_functions().count(), 1);
}

#[test]
fn michael_set_contains_normalizes_cleanly() {
    let mut verifier = verifier_for(fixtures::michael_set_program(), fixtures::michael_set_config());
    let normalized = verifier.normalized().expect("branch/loop desugaring should succeed");
    assert_eq!(normalized.interface_functions().count(), 1);
}

#[test]
fn michael_set_hiding_variant_is_rejected_as_variable_hiding() {
    let mut verifier = verifier_for(fixtures::michael_set_hiding_program(), fixtures::michael_set_config());
    let result = verifier.verify_result().expect("the driver itself should not error");
    let contains = result.functions.iter().find(|f| f.function == "contains").unwrap();
    match &contains.verdict {
        FunctionVerdict::VerificationError(heal_verify::VerificationError::Access { source, .. }) => {
            assert!(matches!(source, heal_verify::error::AccessError::VariableHiding { .. }));
        }
        other => panic!("expected a VariableHiding access error, got {other:?}"),
    }
}
