//! `Assume`'s post-image (spec.md §4.4), grounded on
//! `original_source/src/engine/solver/post_assume.cpp`: conjoin the
//! condition, then check `ImpliesFalse` — an unsatisfiable result yields an
//! empty `PostImage` (P4) rather than an error.
//!
//! `e1 || e2` is handled here rather than in `logic::eval`, by recursing
//! structurally and unioning each branch's post-image — `Formula` has no
//! disjunction variant, so nondeterministic choice is a post-image-level
//! concept, exactly as spec.md §4.5 describes `choice`.

use crate::ast::expr::{BinaryOperator, Expression};
use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::error::VerificationError;
use crate::logic::eval::atomic_stack_axiom;
use crate::logic::formula::{Annotation, Axiom, Formula};
use crate::solver::effect::PostImage;

pub fn post_assume<B: SmtBackend>(
    encoder: &mut Encoder<B>,
    pre: &Annotation,
    condition: &Expression,
) -> Result<PostImage, VerificationError> {
    let mut out = PostImage::infeasible();
    for branch_condition in split_disjuncts(condition) {
        let axiom = atomic_stack_axiom(pre, &branch_condition)?;
        let mut post = pre.clone();
        post.now = post.now.conjoin(Formula::Axiom(Axiom::Stack(axiom)));
        encoder.push();
        encoder.add_premise(&post.now);
        let infeasible = encoder.implies_false();
        encoder.pop();
        if infeasible {
            // `post.now` is UNSAT: this branch is infeasible, not an error.
            continue;
        }
        out.successors.push(post);
    }
    Ok(out)
}

/// Splits a (possibly nested) `||` into its disjuncts, left to right.
/// Anything else is a single atomic leaf.
fn split_disjuncts(expr: &Expression) -> Vec<Expression> {
    match expr {
        Expression::Binary(BinaryOperator::Or, lhs, rhs) => {
            let mut out = split_disjuncts(lhs);
            out.extend(split_disjuncts(rhs));
            out
        }
        other => vec![crate::ast::expr::copy_expr(other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{Type, VariableDeclaration};
    use crate::logic::formula::EqualsToAxiom;
    use crate::logic::symbol::SymbolFactory;

    struct NullBackend;
    impl crate::encoder::SmtTerm for bool {
        fn and(&self, other: &Self) -> Self {
            *self && *other
        }
        fn or(&self, other: &Self) -> Self {
            *self || *other
        }
        fn not(&self) -> Self {
            !*self
        }
        fn implies(&self, other: &Self) -> Self {
            !*self || *other
        }
        fn eq_term(&self, other: &Self) -> Self {
            self == other
        }
        fn distinct(&self, other: &Self) -> Self {
            self != other
        }
    }
    impl crate::encoder::SmtBackend for NullBackend {
        type Term = bool;
        fn declare_symbol(&mut self, _: &crate::logic::symbol::Symbol) -> bool {
            true
        }
        fn null_term(&mut self, _: crate::ast::types::Sort) -> bool {
            false
        }
        fn min_term(&mut self) -> bool {
            false
        }
        fn max_term(&mut self) -> bool {
            false
        }
        fn bool_term(&mut self, value: bool) -> bool {
            value
        }
        fn set_contains(&mut self, _: &bool, _: &bool) -> bool {
            true
        }
        fn set_is_empty(&mut self, _: &bool) -> bool {
            true
        }
        fn push(&mut self) {}
        fn pop(&mut self) {}
        fn add_premise(&mut self, _: bool) {}
        fn check_unsat_with(&mut self, additional: bool) -> bool {
            !additional
        }
    }

    #[test]
    fn disjunctive_assume_splits_into_two_successors() {
        let mut factory = SymbolFactory::new();
        let decl = VariableDeclaration::new("b", Type::bool(), false);
        let value = factory.fresh_first_order(Type::bool());
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: decl.clone(),
            value: value.clone(),
        }));
        let pre = Annotation::new(now);
        let mut encoder = Encoder::new(NullBackend);
        let condition = Expression::Binary(
            BinaryOperator::Or,
            Box::new(Expression::var(&decl)),
            Box::new(Expression::Negated(Box::new(Expression::var(&decl)))),
        );
        let image = post_assume(&mut encoder, &pre, &condition).unwrap();
        assert_eq!(image.successors.len(), 2);
    }
}
