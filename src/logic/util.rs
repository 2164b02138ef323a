//! `Copy`/`Conjoin`/`Replace`/`SyntacticallyContains`/`Collect` (spec.md §4.2),
//! grounded 1:1 on `src/heal/util/{conjoin,contains,replace}.cpp`.

use crate::logic::formula::{
    Annotation, Axiom, EqualsToAxiom, Formula, FulfillmentAxiom, MemoryResource, ObligationAxiom,
    StackAxiom, SymbolicValue,
};
use crate::logic::symbol::Symbol;

/// Structural copy. `Formula`/`Annotation` already derive `Clone`; this free
/// function exists so callers read the same vocabulary the original uses
/// ("`Copy`") rather than reaching for `.clone()` inconsistently.
pub fn copy_formula(formula: &Formula) -> Formula {
    formula.clone()
}

/// Splices `other` into `annotation`: its `now` conjuncts are appended, and
/// both the past and future predicate deques are appended in order. Grounded
/// on `conjoin.cpp`'s handling of `Annotation::Conjoin`, where the original's
/// single `time` deque corresponds to our split past/future deques.
pub fn conjoin_annotation(mut annotation: Annotation, other: Annotation) -> Annotation {
    annotation.now = std::mem::replace(&mut annotation.now, Formula::empty_conjunction())
        .conjoin(other.now);
    annotation.past.extend(other.past);
    annotation.future.extend(other.future);
    annotation
}

/// Replaces every occurrence of `from` with `to` throughout `formula`
/// (grounded on `replace.cpp`'s `ReplaceSymbolVisitor`). Used by
/// `crate::logic::rename` to apply a renaming substitution.
pub fn replace_symbol(formula: &Formula, from: &Symbol, to: &Symbol) -> Formula {
    substitute_symbols(formula, &mut |s| if s == from { to.clone() } else { s.clone() })
}

/// General substitution engine: applies `subst` to every symbol leaf in
/// `formula`. `replace_symbol` and `crate::logic::rename`'s renamings are
/// both just particular choices of `subst`.
pub fn substitute_symbols(formula: &Formula, subst: &mut impl FnMut(&Symbol) -> Symbol) -> Formula {
    match formula {
        Formula::Axiom(axiom) => Formula::Axiom(substitute_in_axiom(axiom, subst)),
        Formula::SeparatingConjunction(items) => Formula::SeparatingConjunction(
            items.iter().map(|f| substitute_symbols(f, subst)).collect(),
        ),
        Formula::SeparatingImplication(lhs, rhs) => Formula::SeparatingImplication(
            Box::new(substitute_symbols(lhs, subst)),
            Box::new(substitute_symbols(rhs, subst)),
        ),
        Formula::Negated(inner) => Formula::Negated(Box::new(substitute_symbols(inner, subst))),
    }
}

fn substitute_value(value: &SymbolicValue, subst: &mut impl FnMut(&Symbol) -> Symbol) -> SymbolicValue {
    match value {
        SymbolicValue::Symbol(s) => SymbolicValue::Symbol(subst(s)),
        other => other.clone(),
    }
}

fn substitute_in_axiom(axiom: &Axiom, subst: &mut impl FnMut(&Symbol) -> Symbol) -> Axiom {
    match axiom {
        Axiom::Memory(resource) => {
            let replace_core = |core: &crate::logic::formula::MemoryAxiom,
                                 subst: &mut dyn FnMut(&Symbol) -> Symbol| {
                crate::logic::formula::MemoryAxiom {
                    node: subst(&core.node),
                    flow: subst(&core.flow),
                    fields: core
                        .fields
                        .iter()
                        .map(|(field, sym)| (field.clone(), subst(sym)))
                        .collect(),
                }
            };
            Axiom::Memory(match resource {
                MemoryResource::Local(core) => MemoryResource::Local(replace_core(core, subst)),
                MemoryResource::Shared(core) => MemoryResource::Shared(replace_core(core, subst)),
            })
        }
        Axiom::EqualsTo(a) => Axiom::EqualsTo(EqualsToAxiom {
            variable: a.variable.clone(),
            value: subst(&a.value),
        }),
        Axiom::Stack(a) => Axiom::Stack(StackAxiom {
            op: a.op,
            lhs: substitute_value(&a.lhs, subst),
            rhs: substitute_value(&a.rhs, subst),
        }),
        Axiom::InflowEmptiness(a) => Axiom::InflowEmptiness(crate::logic::formula::InflowEmptinessAxiom {
            flow: subst(&a.flow),
            is_empty: a.is_empty,
        }),
        Axiom::InflowContains(a) => {
            Axiom::InflowContains(match a {
                crate::logic::formula::InflowContainsAxiom::Value { flow, value } => {
                    crate::logic::formula::InflowContainsAxiom::Value {
                        flow: subst(flow),
                        value: subst(value),
                    }
                }
                crate::logic::formula::InflowContainsAxiom::Range { flow, low, high } => {
                    crate::logic::formula::InflowContainsAxiom::Range {
                        flow: subst(flow),
                        low: substitute_value(low, subst),
                        high: substitute_value(high, subst),
                    }
                }
            })
        }
        Axiom::Obligation(a) => Axiom::Obligation(ObligationAxiom {
            kind: a.kind.clone(),
            arg: subst(&a.arg),
        }),
        Axiom::Fulfillment(a) => Axiom::Fulfillment(FulfillmentAxiom {
            kind: a.kind.clone(),
            arg: subst(&a.arg),
            result: substitute_value(&a.result, subst),
        }),
    }
}

/// Result of a [`syntactically_contains`] query: whether `needle` occurs at
/// all, and whether any occurrence sits inside an obligation/fulfillment
/// marker. Grounded on `contains.cpp`'s `ContainsChecker`, which sets an
/// `within_obligation` flag entering an `ObligationAxiom` and clears it on
/// exit; some simplifications must not cross that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainsResult {
    pub found: bool,
    pub within_obligation: bool,
}

pub fn syntactically_contains(formula: &Formula, needle: &Symbol) -> ContainsResult {
    let mut within_obligation = false;
    let found = contains_rec(formula, needle, &mut within_obligation);
    ContainsResult {
        found,
        within_obligation,
    }
}

fn contains_rec(formula: &Formula, needle: &Symbol, within_obligation: &mut bool) -> bool {
    match formula {
        Formula::Axiom(axiom) => axiom_contains(axiom, needle, within_obligation),
        Formula::SeparatingConjunction(items) => items
            .iter()
            .fold(false, |found, item| contains_rec(item, needle, within_obligation) || found),
        Formula::SeparatingImplication(lhs, rhs) => {
            let l = contains_rec(lhs, needle, within_obligation);
            let r = contains_rec(rhs, needle, within_obligation);
            l || r
        }
        Formula::Negated(inner) => contains_rec(inner, needle, within_obligation),
    }
}

fn axiom_contains(axiom: &Axiom, needle: &Symbol, within_obligation: &mut bool) -> bool {
    let found = match axiom {
        Axiom::Memory(resource) => {
            let core = resource.core();
            &core.node == needle || &core.flow == needle || core.fields.values().any(|s| s == needle)
        }
        Axiom::EqualsTo(a) => &a.value == needle,
        Axiom::Stack(a) => value_contains(&a.lhs, needle) || value_contains(&a.rhs, needle),
        Axiom::InflowEmptiness(a) => &a.flow == needle,
        Axiom::InflowContains(a) => match a {
            crate::logic::formula::InflowContainsAxiom::Value { flow, value } => {
                flow == needle || value == needle
            }
            crate::logic::formula::InflowContainsAxiom::Range { flow, low, high } => {
                flow == needle || value_contains(low, needle) || value_contains(high, needle)
            }
        },
        Axiom::Obligation(a) => {
            let hit = &a.arg == needle;
            if hit {
                *within_obligation = true;
            }
            hit
        }
        Axiom::Fulfillment(a) => {
            let hit = &a.arg == needle || value_contains(&a.result, needle);
            if hit {
                *within_obligation = true;
            }
            hit
        }
    };
    found
}

fn value_contains(value: &SymbolicValue, needle: &Symbol) -> bool {
    matches!(value, SymbolicValue::Symbol(s) if s == needle)
}

/// Implemented once per axiom kind so [`collect`] can be written generically
/// (spec.md §4.2 `Collect<T>`).
pub trait CollectKind: Sized {
    fn extract(axiom: &Axiom) -> Option<&Self>;
}

impl CollectKind for ObligationAxiom {
    fn extract(axiom: &Axiom) -> Option<&Self> {
        match axiom {
            Axiom::Obligation(a) => Some(a),
            _ => None,
        }
    }
}

impl CollectKind for FulfillmentAxiom {
    fn extract(axiom: &Axiom) -> Option<&Self> {
        match axiom {
            Axiom::Fulfillment(a) => Some(a),
            _ => None,
        }
    }
}

impl CollectKind for MemoryResource {
    fn extract(axiom: &Axiom) -> Option<&Self> {
        match axiom {
            Axiom::Memory(a) => Some(a),
            _ => None,
        }
    }
}

impl CollectKind for EqualsToAxiom {
    fn extract(axiom: &Axiom) -> Option<&Self> {
        match axiom {
            Axiom::EqualsTo(a) => Some(a),
            _ => None,
        }
    }
}

impl CollectKind for StackAxiom {
    fn extract(axiom: &Axiom) -> Option<&Self> {
        match axiom {
            Axiom::Stack(a) => Some(a),
            _ => None,
        }
    }
}

pub fn collect<'a, T: CollectKind>(
    formula: &'a Formula,
    filter: impl Fn(&T) -> bool,
) -> Vec<&'a T> {
    let mut out = Vec::new();
    collect_rec(formula, &filter, &mut out);
    out
}

fn collect_rec<'a, T: CollectKind>(
    formula: &'a Formula,
    filter: &impl Fn(&T) -> bool,
    out: &mut Vec<&'a T>,
) {
    match formula {
        Formula::Axiom(axiom) => {
            if let Some(item) = T::extract(axiom) {
                if filter(item) {
                    out.push(item);
                }
            }
        }
        Formula::SeparatingConjunction(items) => {
            for item in items {
                collect_rec(item, filter, out);
            }
        }
        Formula::SeparatingImplication(lhs, rhs) => {
            collect_rec(lhs, filter, out);
            collect_rec(rhs, filter, out);
        }
        Formula::Negated(inner) => collect_rec(inner, filter, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;
    use crate::logic::formula::ObligationKind;
    use crate::logic::symbol::SymbolFactory;
    use std::sync::Arc;

    #[test]
    fn collect_finds_only_matching_kind() {
        let mut factory = SymbolFactory::new();
        let arg = factory.fresh_first_order(Type::data());
        let obligation = Formula::Axiom(Axiom::Obligation(ObligationAxiom {
            kind: ObligationKind(Arc::from("contains")),
            arg: arg.clone(),
        }));
        let stack = Formula::Axiom(Axiom::Stack(StackAxiom {
            op: StackOp::Eq,
            lhs: SymbolicValue::Symbol(arg),
            rhs: SymbolicValue::Null,
        }));
        let now = obligation.conjoin(stack);
        let obligations = collect::<ObligationAxiom>(&now, |_| true);
        assert_eq!(obligations.len(), 1);
    }

    #[test]
    fn replace_symbol_swaps_every_occurrence() {
        let mut factory = SymbolFactory::new();
        let a = factory.fresh_first_order(Type::data());
        let b = factory.fresh_first_order(Type::data());
        let formula = Formula::Axiom(Axiom::Stack(StackAxiom {
            op: StackOp::Eq,
            lhs: SymbolicValue::Symbol(a.clone()),
            rhs: SymbolicValue::Symbol(a.clone()),
        }));
        let replaced = replace_symbol(&formula, &a, &b);
        let contains_a = syntactically_contains(&replaced, &a);
        let contains_b = syntactically_contains(&replaced, &b);
        assert!(!contains_a.found);
        assert!(contains_b.found);
    }

    #[test]
    fn syntactically_contains_flags_obligation_boundary() {
        let mut factory = SymbolFactory::new();
        let arg = factory.fresh_first_order(Type::data());
        let formula = Formula::Axiom(Axiom::Obligation(ObligationAxiom {
            kind: ObligationKind(Arc::from("insert")),
            arg: arg.clone(),
        }));
        let result = syntactically_contains(&formula, &arg);
        assert!(result.found);
        assert!(result.within_obligation);
    }
}
