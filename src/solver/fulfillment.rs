//! Fulfillment search, grounded on
//! `original_source/src/engine/solver/ful.cpp`'s `FulfillmentFinder`: for
//! `now` and each retained past predicate, push it as a premise and ask,
//! per still-live `ObligationAxiom`, whether some linearization result is
//! now entailed. A discharged obligation gets a `FulfillmentAxiom`
//! appended — the obligation itself is never removed (spec.md I4: a
//! fulfillment witnesses discharge, it doesn't retract the obligation).

use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::logic::formula::{Annotation, Axiom, Formula, FulfillmentAxiom, ObligationAxiom, SymbolicValue};
use crate::logic::util::collect;

/// One candidate linearization result to probe for each live obligation —
/// callers supply the result values their interface functions can return
/// (e.g. `true`/`false` for `contains`, the popped value for `pop`).
pub fn search_fulfillments<B: SmtBackend>(
    encoder: &mut Encoder<B>,
    annotation: &Annotation,
    candidate_results: &[SymbolicValue],
) -> Annotation {
    let mut out = annotation.clone();
    let now_premises = out.now.clone();
    out.now = discharge_against(encoder, &now_premises, out.now.clone(), candidate_results);

    let mut past = Vec::with_capacity(out.past.len());
    for pred in std::mem::take(&mut out.past) {
        let premises = out.now.clone().conjoin(pred.formula.clone());
        let formula = discharge_against(encoder, &premises, pred.formula, candidate_results);
        past.push(crate::logic::formula::PastPredicate { formula });
    }
    out.past = past.into();
    out
}

fn discharge_against<B: SmtBackend>(
    encoder: &mut Encoder<B>,
    premises: &Formula,
    target: Formula,
    candidate_results: &[SymbolicValue],
) -> Formula {
    let obligations: Vec<ObligationAxiom> =
        collect::<ObligationAxiom>(&target, |_| true).into_iter().cloned().collect();
    let mut fulfillments = Vec::new();
    for obligation in &obligations {
        for result in candidate_results {
            let goal = Formula::Axiom(Axiom::Fulfillment(FulfillmentAxiom {
                kind: obligation.kind.clone(),
                arg: obligation.arg.clone(),
                result: result.clone(),
            }));
            if encoder.entails(premises, &goal) {
                fulfillments.push(goal);
                break;
            }
        }
    }
    fulfillments.into_iter().fold(target, Formula::conjoin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::z3_backend::Z3Backend;
    use crate::logic::formula::ObligationKind;
    use crate::logic::symbol::SymbolFactory;

    #[test]
    fn fulfillment_search_leaves_the_obligation_in_place() {
        let mut factory = SymbolFactory::new();
        let mut encoder = Encoder::new(Z3Backend::new());
        let arg = factory.fresh_first_order(crate::ast::types::Type::data());
        let now = Formula::Axiom(Axiom::Obligation(ObligationAxiom {
            kind: ObligationKind(std::sync::Arc::from("contains")),
            arg,
        }));
        let annotation = Annotation::new(now);
        let result = search_fulfillments(&mut encoder, &annotation, &[SymbolicValue::Bool(true), SymbolicValue::Bool(false)]);
        assert_eq!(collect::<ObligationAxiom>(&result.now, |_| true).len(), 1);
    }
}
