//! Driver and solver configuration (spec.md §5, §6), grounded on
//! `database.rs`'s `DbOptions` for the driver side and on
//! `original_source/src/plankton/config.hpp` for the structure-specific
//! blueprints the encoder instantiates.

use crate::logic::properties::Property;

/// Options that govern how the [`crate::verifier::Verifier`] runs, not what
/// it verifies — mirrors `DbOptions`'s plain-flags shape (`jobs`, `timing`,
/// `trace_recalc`) rather than introducing a builder.
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    /// Worker-thread count for the `Executor` that dispatches per-interface-
    /// function verification. `0` means "use the number of available cores",
    /// matching `DbOptions::jobs`'s convention.
    pub jobs: usize,
    /// Print `"{pass} {ms}ms"` for each post-image/join/fixpoint round to
    /// stderr, the way `database.rs`'s `time()` helper does when
    /// `DbOptions::timing` is set.
    pub timing: bool,
    /// Log every fixed-point iteration's annotation (verbose; for debugging
    /// non-termination), mirroring `DbOptions::trace_recalc`.
    pub trace_recalc: bool,
    /// Widening policy. Only `Fast` is implemented (spec.md §9 Open
    /// Question); reserved so a future aggressive policy has a slot.
    pub widening: WideningPolicy,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        VerifierOptions {
            jobs: 0,
            timing: false,
            trace_recalc: false,
            widening: WideningPolicy::Fast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideningPolicy {
    Fast,
}

/// Structure-specific inputs the user supplies alongside the program
/// (spec.md §6 "Configured inputs"): the flow-set domain plus four property
/// blueprints the encoder instantiates per concrete node resource.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Domain of flow-set values (e.g. the key type of a set, or `data` for
    /// an unordered bag); only used to type-check blueprint instantiation.
    pub flow_value_type: crate::ast::types::Type,
    /// `local_node_invariant(node)`: must hold of every freshly malloc'd
    /// cell and of every local-memory resource after each post-image step.
    pub local_node_invariant: Property,
    /// `shared_node_invariant(node)`: must hold of every shared-memory
    /// resource `MakeMemoryAccessible` conjoins.
    pub shared_node_invariant: Property,
    /// `outflow(node, value)` per pointer field — which values the node's
    /// successor(s) logically export. One blueprint per field name.
    pub outflow: Vec<(String, Property)>,
    /// `logically_contains(node, value)`: the data-structure's abstract
    /// membership predicate, used to discharge `contains`-style obligations.
    pub logically_contains: Property,
}

impl SolverConfig {
    pub fn outflow_for(&self, field: &str) -> Option<&Property> {
        self.outflow.iter().find(|(name, _)| name == field).map(|(_, p)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;
    use crate::logic::properties::{make_invariant, make_predicate};
    use crate::ast::types::VariableDeclaration;
    use crate::ast::expr::Expression;

    #[test]
    fn default_options_use_fast_widening() {
        let opts = VerifierOptions::default();
        assert_eq!(opts.widening, WideningPolicy::Fast);
        assert_eq!(opts.jobs, 0);
    }

    #[test]
    fn outflow_for_looks_up_by_field_name() {
        let node = VariableDeclaration::new("n", Type::data(), false);
        let value = VariableDeclaration::new("v", Type::data(), false);
        let next_outflow =
            make_predicate("next_outflow", node.clone(), value.clone(), Expression::BoolValue(true)).unwrap();
        let invariant = make_invariant("inv", node.clone(), Expression::BoolValue(true)).unwrap();
        let contains = make_predicate("contains", node, value, Expression::BoolValue(true)).unwrap();
        let config = SolverConfig {
            flow_value_type: Type::data(),
            local_node_invariant: invariant.clone(),
            shared_node_invariant: invariant,
            outflow: vec![("next".into(), next_outflow)],
            logically_contains: contains,
        };
        assert!(config.outflow_for("next").is_some());
        assert!(config.outflow_for("prev").is_none());
    }
}
