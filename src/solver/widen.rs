//! Widening, grounded on `original_source/src/engine/solver/widen.cpp`'s
//! `ResourceKeeper`: a coarsening applied when a loop head is revisited, to
//! guarantee termination of the post-image fixed-point loop. Local
//! resources, `EqualsToAxiom`s, and obligation/fulfillment bookkeeping are
//! always kept; shared resources are kept only if some `EqualsToAxiom`
//! still points at them; bare `StackAxiom`s are dropped and re-derived by
//! `fast_extend`'s FAST policy rather than kept verbatim (spec.md §4.4).

use std::collections::HashSet;

use crate::encoder::extend::fast_extend;
use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::logic::formula::{Annotation, Axiom, Formula, MemoryResource};
use crate::logic::symbol::Symbol;
use crate::logic::util::collect;

pub fn widen<B: SmtBackend>(encoder: &mut Encoder<B>, annotation: &Annotation) -> Annotation {
    let referenced: HashSet<Symbol> = collect::<crate::logic::formula::EqualsToAxiom>(&annotation.now, |_| true)
        .into_iter()
        .map(|a| a.value.clone())
        .collect();

    let kept = keep_conjuncts(&annotation.now, &referenced);
    let mut retained = Annotation::new(kept);
    retained.now = retained.now.conjoin(fast_extend(encoder, &retained));

    retained.past = annotation
        .past
        .iter()
        .filter(|p| formula_references(&p.formula, &referenced))
        .cloned()
        .collect();
    retained.future = annotation.future.clone();

    retained
}

fn keep_conjuncts(formula: &Formula, referenced: &HashSet<Symbol>) -> Formula {
    Formula::SeparatingConjunction(
        formula
            .conjuncts()
            .iter()
            .filter(|f| should_keep(f, referenced))
            .cloned()
            .collect(),
    )
}

fn should_keep(formula: &Formula, referenced: &HashSet<Symbol>) -> bool {
    match formula {
        Formula::Axiom(Axiom::Memory(MemoryResource::Local(_))) => true,
        Formula::Axiom(Axiom::Memory(MemoryResource::Shared(core))) => referenced.contains(&core.node),
        Formula::Axiom(Axiom::EqualsTo(_)) => true,
        Formula::Axiom(Axiom::Obligation(_)) => true,
        Formula::Axiom(Axiom::Fulfillment(_)) => true,
        Formula::Axiom(Axiom::Stack(_)) => false,
        Formula::Axiom(Axiom::InflowEmptiness(_)) => false,
        Formula::Axiom(Axiom::InflowContains(_)) => false,
        other => formula_references(other, referenced),
    }
}

fn formula_references(formula: &Formula, referenced: &HashSet<Symbol>) -> bool {
    match formula {
        Formula::Axiom(Axiom::EqualsTo(a)) => referenced.contains(&a.value),
        Formula::Axiom(Axiom::Memory(r)) => referenced.contains(&r.core().node),
        Formula::Axiom(Axiom::Stack(a)) => stack_value_referenced(&a.lhs, referenced) || stack_value_referenced(&a.rhs, referenced),
        Formula::Axiom(_) => false,
        Formula::SeparatingConjunction(items) => items.iter().any(|f| formula_references(f, referenced)),
        Formula::SeparatingImplication(lhs, rhs) => {
            formula_references(lhs, referenced) || formula_references(rhs, referenced)
        }
        Formula::Negated(inner) => formula_references(inner, referenced),
    }
}

fn stack_value_referenced(value: &crate::logic::formula::SymbolicValue, referenced: &HashSet<Symbol>) -> bool {
    matches!(value, crate::logic::formula::SymbolicValue::Symbol(s) if referenced.contains(s))
}
