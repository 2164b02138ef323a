//! Scalar `Assignment`/`ParallelAssignment` post-images (spec.md §4.4),
//! grounded on `original_source/src/engine/solver/post_assign.cpp`: neither
//! side dereferences the heap, so there is no `HeapEffect` to record — only
//! a rebind. `ParallelAssignment` evaluates the whole right-hand-side tuple
//! against the unmodified `pre.now` before applying any rebind, the same
//! simultaneous semantics as `post_read`.

use std::sync::Arc;

use crate::ast::expr::Expression;
use crate::ast::types::VariableDeclaration;
use crate::error::VerificationError;
use crate::logic::eval::eval_expr;
use crate::logic::formula::{Annotation, Axiom, Formula, StackAxiom, StackOp, SymbolicValue};
use crate::logic::symbol::SymbolFactory;
use crate::solver::effect::PostImage;
use crate::solver::scope::rebind;

pub fn post_assignment(
    factory: &mut SymbolFactory,
    pre: &Annotation,
    lhs: &Arc<VariableDeclaration>,
    rhs: &Expression,
) -> Result<PostImage, VerificationError> {
    post_parallel_assignment(factory, pre, std::slice::from_ref(lhs), std::slice::from_ref(rhs))
}

pub fn post_parallel_assignment(
    factory: &mut SymbolFactory,
    pre: &Annotation,
    lhs: &[Arc<VariableDeclaration>],
    rhs: &[Expression],
) -> Result<PostImage, VerificationError> {
    let mut values = Vec::with_capacity(rhs.len());
    for expr in rhs {
        values.push(eval_expr(pre, expr)?);
    }

    let mut post = pre.clone();
    for (decl, value) in lhs.iter().zip(values) {
        post.now = match value {
            SymbolicValue::Symbol(s) => rebind(post.now, decl, s),
            other => {
                // A non-symbolic literal (bool/null/min/max): rebind to a
                // fresh symbol and pin it to the literal via a stack axiom,
                // since `EqualsToAxiom::value` is always a `Symbol`.
                let fresh = factory.fresh_first_order(decl.ty.clone());
                rebind(post.now, decl, fresh.clone()).conjoin(Formula::Axiom(Axiom::Stack(StackAxiom {
                    op: StackOp::Eq,
                    lhs: SymbolicValue::Symbol(fresh),
                    rhs: other,
                })))
            }
        };
    }
    Ok(PostImage::single(post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;
    use crate::logic::eval::find_equals_to;
    use crate::logic::formula::EqualsToAxiom;
    use crate::logic::symbol::SymbolFactory;

    #[test]
    fn parallel_assignment_swaps_two_variables_simultaneously() {
        let mut factory = SymbolFactory::new();
        let a = VariableDeclaration::new("a", Type::data(), false);
        let b = VariableDeclaration::new("b", Type::data(), false);
        let a_value = factory.fresh_first_order(Type::data());
        let b_value = factory.fresh_first_order(Type::data());
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: a.clone(),
            value: a_value.clone(),
        }))
        .conjoin(Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: b.clone(),
            value: b_value.clone(),
        })));
        let pre = Annotation::new(now);
        let image = post_parallel_assignment(
            &mut factory,
            &pre,
            &[a.clone(), b.clone()],
            &[Expression::var(&b), Expression::var(&a)],
        )
        .unwrap();
        let post = &image.successors[0];
        assert_eq!(find_equals_to(post, &a).unwrap(), b_value);
        assert_eq!(find_equals_to(post, &b).unwrap(), a_value);
    }
}
