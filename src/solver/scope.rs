//! `PostEnter`/`PostLeave` (spec.md §4.4), grounded on
//! `original_source/src/engine/solver/scope.cpp`: entering a scope binds
//! every declared variable to a fresh symbol (rejecting hiding of a
//! still-open outer binding of the same name); leaving one drops the
//! departing variables' bindings and any future predicate that mentions
//! them.

use std::sync::Arc;

use crate::ast::types::{Type, VariableDeclaration};
use crate::error::{AccessError, VerificationError};
use crate::logic::eval::{find_equals_to, find_equals_to_by_name};
use crate::logic::formula::{Annotation, Axiom, EqualsToAxiom, Formula, FuturePredicate};
use crate::logic::symbol::{Symbol, SymbolFactory};

/// Drops `decl`'s current `EqualsToAxiom`, if any, and conjoins a fresh one
/// binding it to `value`. Used by every per-command rule that rebinds a
/// variable (`post_malloc`, `post_read`, `post_assign`, and scope entry).
pub fn rebind(formula: Formula, decl: &Arc<VariableDeclaration>, value: Symbol) -> Formula {
    let without_old = drop_equals_to(formula, decl);
    without_old.conjoin(Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
        variable: decl.clone(),
        value,
    })))
}

fn drop_equals_to(formula: Formula, decl: &Arc<VariableDeclaration>) -> Formula {
    match formula {
        Formula::SeparatingConjunction(items) => Formula::SeparatingConjunction(
            items
                .into_iter()
                .filter(|f| !matches!(f, Formula::Axiom(Axiom::EqualsTo(a)) if &a.variable == decl))
                .collect(),
        ),
        Formula::Axiom(Axiom::EqualsTo(a)) if &a.variable == decl => Formula::empty_conjunction(),
        other => other,
    }
}

/// Binds every variable declared by an entered scope to a fresh,
/// uninitialized symbol. Rejects hiding: a declaration whose name already
/// has a live binding from an enclosing, still-open scope is an error
/// (spec.md §8 boundary scenario 6), since nothing in this core renames
/// shadowed variables.
pub fn post_enter(
    pre: &Annotation,
    factory: &mut SymbolFactory,
    declared: &[Arc<VariableDeclaration>],
) -> Result<Annotation, VerificationError> {
    let mut post = pre.clone();
    for decl in declared {
        if find_equals_to_by_name(&post, &decl.name) {
            return Err(VerificationError::Access {
                command: format!("enter scope declaring `{}`", decl.name),
                source: AccessError::VariableHiding { variable: decl.name.clone() },
            });
        }
        let fresh = factory.fresh_first_order(decl.ty.clone());
        post.now = rebind(post.now, decl, fresh);
    }
    Ok(post)
}

/// Drops the leaving variables' `EqualsToAxiom`s from `now`, and discards
/// any future predicate whose guard, update, or post-formula mentions one
/// of them (it can never be discharged or re-evaluated once the variable
/// is gone).
pub fn post_leave(pre: &Annotation, leaving: &[Arc<VariableDeclaration>]) -> Annotation {
    let mut post = pre.clone();
    for decl in leaving {
        post.now = drop_equals_to(post.now, decl);
    }
    post.future
        .retain(|pred| !future_mentions_any(pred, leaving));
    post
}

fn future_mentions_any(pred: &FuturePredicate, leaving: &[Arc<VariableDeclaration>]) -> bool {
    [&pred.guard, &pred.update, &pred.post]
        .iter()
        .any(|f| formula_mentions_any(f, leaving))
}

fn formula_mentions_any(formula: &Formula, leaving: &[Arc<VariableDeclaration>]) -> bool {
    match formula {
        Formula::Axiom(Axiom::EqualsTo(a)) => leaving.iter().any(|d| d == &a.variable),
        Formula::Axiom(_) => false,
        Formula::SeparatingConjunction(items) => items.iter().any(|f| formula_mentions_any(f, leaving)),
        Formula::SeparatingImplication(lhs, rhs) => {
            formula_mentions_any(lhs, leaving) || formula_mentions_any(rhs, leaving)
        }
        Formula::Negated(inner) => formula_mentions_any(inner, leaving),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_enter_binds_declared_variables_to_fresh_symbols() {
        let mut factory = SymbolFactory::new();
        let x = VariableDeclaration::new("x", Type::data(), false);
        let pre = Annotation::empty();
        let post = post_enter(&pre, &mut factory, std::slice::from_ref(&x)).unwrap();
        assert!(find_equals_to(&post, &x).is_some());
    }

    #[test]
    fn post_enter_rejects_hiding_a_still_open_binding() {
        let mut factory = SymbolFactory::new();
        let x = VariableDeclaration::new("x", Type::data(), false);
        let pre = post_enter(&Annotation::empty(), &mut factory, std::slice::from_ref(&x)).unwrap();
        let result = post_enter(&pre, &mut factory, std::slice::from_ref(&x));
        assert!(result.is_err());
    }

    #[test]
    fn post_enter_rejects_hiding_by_name_even_with_distinct_declarations() {
        let mut factory = SymbolFactory::new();
        let outer = VariableDeclaration::new("x", Type::data(), false);
        let inner = VariableDeclaration::new("x", Type::data(), false);
        assert_ne!(outer, inner, "the two declarations must be distinct, not clones of one Arc");
        let pre = post_enter(&Annotation::empty(), &mut factory, std::slice::from_ref(&outer)).unwrap();
        let result = post_enter(&pre, &mut factory, std::slice::from_ref(&inner));
        assert!(result.is_err());
    }

    #[test]
    fn post_leave_drops_the_leaving_variables_binding() {
        let mut factory = SymbolFactory::new();
        let x = VariableDeclaration::new("x", Type::data(), false);
        let pre = post_enter(&Annotation::empty(), &mut factory, std::slice::from_ref(&x)).unwrap();
        let post = post_leave(&pre, std::slice::from_ref(&x));
        assert!(find_equals_to(&post, &x).is_none());
    }
}
