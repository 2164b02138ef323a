//! The FAST widening-extension policy (spec.md §4.4/§9): after widening
//! drops all pure stack axioms, re-derive the ones that still hold from a
//! *bounded* candidate set — equalities/disequalities between a node's own
//! address/fields and null, and between two fields of the same node. An
//! "aggressive" policy extending candidates across distinct nodes or
//! transitively through the heap is named in spec.md §9 but explicitly out
//! of scope here.

use crate::ast::types::Sort;
use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::logic::formula::{
    Annotation, Axiom, Formula, MemoryResource, StackAxiom, StackOp, SymbolicValue,
};
use crate::logic::symbol::Symbol;
use crate::logic::util::collect;

fn candidate(op: StackOp, lhs: Symbol, rhs: SymbolicValue) -> Formula {
    Formula::Axiom(Axiom::Stack(StackAxiom {
        op,
        lhs: SymbolicValue::Symbol(lhs),
        rhs,
    }))
}

fn node_candidates(node: &Symbol, fields: &[&Symbol]) -> Vec<Formula> {
    let mut out = vec![
        candidate(StackOp::Eq, node.clone(), SymbolicValue::Null),
        candidate(StackOp::Neq, node.clone(), SymbolicValue::Null),
    ];
    for field in fields {
        if field.ty().sort == Sort::Pointer {
            out.push(candidate(StackOp::Eq, (*field).clone(), SymbolicValue::Null));
            out.push(candidate(StackOp::Neq, (*field).clone(), SymbolicValue::Null));
        }
    }
    for i in 0..fields.len() {
        for j in (i + 1)..fields.len() {
            if fields[i].ty() == fields[j].ty() {
                out.push(candidate(
                    StackOp::Eq,
                    fields[i].clone(),
                    SymbolicValue::Symbol(fields[j].clone()),
                ));
                out.push(candidate(
                    StackOp::Neq,
                    fields[i].clone(),
                    SymbolicValue::Symbol(fields[j].clone()),
                ));
            }
        }
    }
    out
}

/// Re-derives the bounded set of pure stack axioms entailed by `retained`
/// (the widened annotation with all stack axioms already dropped), keeping
/// only those the encoder can prove hold.
pub fn fast_extend<B: SmtBackend>(encoder: &mut Encoder<B>, retained: &Annotation) -> Formula {
    let mut kept = Formula::empty_conjunction();
    for resource in collect::<MemoryResource>(&retained.now, |_| true) {
        let core = resource.core();
        let fields: Vec<&Symbol> = core.fields.values().collect();
        for goal in node_candidates(&core.node, &fields) {
            if encoder.entails(&retained.now, &goal) {
                kept = kept.conjoin(goal);
            }
        }
    }
    kept
}
