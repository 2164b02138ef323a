//! Join/unify at a control-flow merge point (spec.md §4.4), grounded on
//! `original_source/src/engine/solver/widen.cpp`'s unify step (the same
//! file as widening — the original treats "join the branches" and "widen a
//! loop head" as two instantiations of one merge primitive): intersect
//! resources syntactically across the input annotations (same node symbol
//! on both sides) and keep a `StackAxiom` only if every input's `now`
//! implies it.

use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::logic::formula::{Annotation, Axiom, Formula, MemoryResource};
use crate::logic::symbol::Symbol;
use crate::logic::util::collect;

/// Joins two or more branch annotations into one over-approximation. Local
/// resources, `EqualsToAxiom`s, and obligation/fulfillment axioms for a
/// node are kept if every branch has a resource/axiom for that same node
/// (conservatively: syntactic presence, not semantic equivalence — the
/// original's unify step is likewise a structural merge, not a semantic
/// one). Past predicates are kept only if every branch still carries them;
/// future predicates are unioned (any branch's obligation must still be
/// honored downstream).
pub fn join<B: SmtBackend>(encoder: &mut Encoder<B>, branches: &[Annotation]) -> Annotation {
    assert!(!branches.is_empty(), "join requires at least one branch");
    if branches.len() == 1 {
        return branches[0].clone();
    }

    let shared_nodes: Vec<Symbol> = collect::<MemoryResource>(&branches[0].now, |_| true)
        .into_iter()
        .map(|r| r.core().node.clone())
        .filter(|node| {
            branches[1..]
                .iter()
                .all(|b| collect::<MemoryResource>(&b.now, |r| &r.core().node == node).len() == 1)
        })
        .collect();

    let mut now = Formula::empty_conjunction();
    for resource in collect::<MemoryResource>(&branches[0].now, |_| true) {
        if shared_nodes.contains(&resource.core().node) {
            now = now.conjoin(Formula::Axiom(Axiom::Memory(resource.clone())));
        }
    }
    for axiom in collect::<crate::logic::formula::EqualsToAxiom>(&branches[0].now, |_| true) {
        if branches[1..]
            .iter()
            .all(|b| collect::<crate::logic::formula::EqualsToAxiom>(&b.now, |a| a.variable == axiom.variable).len() == 1)
        {
            now = now.conjoin(Formula::Axiom(Axiom::EqualsTo(axiom.clone())));
        }
    }
    for obligation in collect::<crate::logic::formula::ObligationAxiom>(&branches[0].now, |_| true) {
        now = now.conjoin(Formula::Axiom(Axiom::Obligation(obligation.clone())));
    }
    for fulfillment in collect::<crate::logic::formula::FulfillmentAxiom>(&branches[0].now, |_| true) {
        now = now.conjoin(Formula::Axiom(Axiom::Fulfillment(fulfillment.clone())));
    }

    for candidate in branches[0].now.conjuncts().iter().filter(|f| matches!(f, Formula::Axiom(Axiom::Stack(_)))) {
        if branches.iter().all(|b| encoder.entails(&b.now, candidate)) {
            now = now.conjoin(candidate.clone());
        }
    }

    let mut joined = Annotation::new(now);
    joined.past = branches[0]
        .past
        .iter()
        .filter(|p| branches[1..].iter().all(|b| b.past.iter().any(|q| formulas_match(&p.formula, &q.formula))))
        .cloned()
        .collect();
    joined.future = branches.iter().flat_map(|b| b.future.iter().cloned()).collect();
    joined
}

fn formulas_match(a: &Formula, b: &Formula) -> bool {
    a.to_string() == b.to_string()
}
