//! The implication checker (spec.md §4.3): `AddPremise`, `Push`/`Pop`,
//! `Implies`, `ImpliesFalse`, `ImpliesIsNull`, `ImpliesIsNonNull`,
//! `ComputeImplied`, `ComputeNonNull`, plus `EncodeInvariants`. Built once,
//! generically, over any [`SmtBackend`].

use crate::ast::types::Sort;
use crate::config::SolverConfig;
use crate::encoder::lower::{lower_formula, lower_value};
use crate::encoder::{SmtBackend, SmtTerm};
use crate::error::VerificationError;
use crate::logic::eval::node_invariant_formula;
use crate::logic::formula::{Annotation, Formula, MemoryResource};
use crate::logic::symbol::Symbol;
use crate::logic::util::collect;

pub struct Encoder<B: SmtBackend> {
    backend: B,
}

impl<B: SmtBackend> Encoder<B> {
    pub fn new(backend: B) -> Self {
        Encoder { backend }
    }

    pub fn push(&mut self) {
        self.backend.push();
    }

    pub fn pop(&mut self) {
        self.backend.pop();
    }

    pub fn add_premise(&mut self, formula: &Formula) {
        let term = lower_formula(&mut self.backend, formula);
        self.backend.add_premise(term);
    }

    /// `Implies(goal)`: true iff every currently-asserted premise, together
    /// with the negation of `goal`, is UNSAT (spec.md §4.3).
    pub fn implies(&mut self, goal: &Formula) -> bool {
        let term = lower_formula(&mut self.backend, goal);
        self.backend.check_unsat_with(term.not())
    }

    /// `ImpliesFalse()`: the current premise set alone is UNSAT.
    pub fn implies_false(&mut self) -> bool {
        let top = self.backend.bool_term(true);
        !self.backend.check_unsat_with(top.not())
    }

    pub fn implies_is_null(&mut self, value: &crate::logic::formula::SymbolicValue) -> bool {
        let term = lower_value(&mut self.backend, value);
        let null = self.backend.null_term(Sort::Pointer);
        self.backend.check_unsat_with(term.eq_term(&null).not())
    }

    /// `ImpliesIsNull` under an explicit premise, in its own push/pop
    /// bracket — the `entails`-style wrapper `PrepareAccess` needs to prune a
    /// provably-null pointer before `MakeMemoryAccessible` ever runs (spec.md
    /// §4.4(b)).
    pub fn entails_is_null(
        &mut self,
        premises: &Formula,
        value: &crate::logic::formula::SymbolicValue,
    ) -> bool {
        self.push();
        self.add_premise(premises);
        let result = self.implies_is_null(value);
        self.pop();
        result
    }

    pub fn implies_is_non_null(&mut self, value: &crate::logic::formula::SymbolicValue) -> bool {
        let term = lower_value(&mut self.backend, value);
        let null = self.backend.null_term(Sort::Pointer);
        self.backend.check_unsat_with(term.eq_term(&null))
    }

    /// Convenience wrapping the common "given this premise, does this goal
    /// hold" pattern used throughout the solver in one push/pop bracket.
    pub fn entails(&mut self, premises: &Formula, goal: &Formula) -> bool {
        self.push();
        self.add_premise(premises);
        let result = self.implies(goal);
        self.pop();
        result
    }

    /// `ComputeImplied(batch)`: one bit per goal, evaluated against the
    /// currently-asserted premises in a single session (spec.md §4.3 "to
    /// amortize cost" — each goal still gets its own push/pop bracket so one
    /// goal's negation never leaks into the next, but the backend/context
    /// itself is reused).
    pub fn compute_implied(&mut self, goals: &[Formula]) -> Vec<bool> {
        goals
            .iter()
            .map(|goal| {
                self.push();
                let result = self.implies(goal);
                self.pop();
                result
            })
            .collect()
    }

    /// `ComputeNonNull(set_of_symbols)`: the subset the encoder can prove
    /// non-null under the currently-asserted premises.
    pub fn compute_non_null(&mut self, symbols: &[Symbol]) -> Vec<Symbol> {
        symbols
            .iter()
            .filter(|s| {
                self.push();
                let value = crate::logic::formula::SymbolicValue::Symbol((*s).clone());
                let result = self.implies_is_non_null(&value);
                self.pop();
                result
            })
            .cloned()
            .collect()
    }

    /// `EncodeInvariants`: asserts the configured local/shared node
    /// invariant for every memory resource in `premises.now`, then checks
    /// whether `goal` follows (spec.md §4.3: "structure-specific predicates
    /// supplied by the user as a blueprint that is instantiated over each
    /// node resource in the formula").
    pub fn entails_with_invariants(
        &mut self,
        config: &SolverConfig,
        premises: &Annotation,
        goal: &Formula,
    ) -> Result<bool, VerificationError> {
        self.push();
        self.add_premise(&premises.now);
        for resource in collect::<MemoryResource>(&premises.now, |_| true) {
            let property = if resource.is_shared() {
                &config.shared_node_invariant
            } else {
                &config.local_node_invariant
            };
            let (_, invariant_formula) = node_invariant_formula(property, resource.core())?;
            self.add_premise(&invariant_formula);
        }
        let result = self.implies(goal);
        self.pop();
        Ok(result)
    }

    /// Checks that `resource` itself satisfies its configured invariant
    /// (used right after `Malloc`/`MakeMemoryAccessible` mint a resource,
    /// before it is folded into a larger annotation).
    pub fn check_node_invariant(
        &mut self,
        config: &SolverConfig,
        resource: &MemoryResource,
    ) -> Result<bool, VerificationError> {
        let property = if resource.is_shared() {
            &config.shared_node_invariant
        } else {
            &config.local_node_invariant
        };
        let (scratch, goal) = node_invariant_formula(property, resource.core())?;
        Ok(self.entails(&scratch.now, &goal))
    }
}
