//! Pass 2: `simplify_returns`, grounded on
//! `src/cola/transform/simplifyReturns.cpp`.

use crate::ast::command::Command;
use crate::ast::expr::{negate, Expression};
use crate::ast::stmt::{Scope, Statement};
use crate::ast::types::Sort;

/// Rewrites `return e` into
/// `choice { { assume(e); return true } | { assume(!e); return false } }`
/// whenever `e` is a non-trivial Boolean expression (not already a bare
/// literal/variable/negation thereof) — the original's
/// `dynamic_cast<SimpleExpression>` guard, reproduced here via
/// `Expression::is_simple`. Any other `return` (non-Boolean, or already
/// simple) is left untouched.
pub fn simplify_returns(stmt: Statement) -> Statement {
    match stmt {
        Statement::Command(Command::Return(exprs)) if needs_simplification(&exprs) => {
            let e = exprs.into_iter().next().expect("checked len == 1 above");
            let negated = negate(&e);
            Statement::Choice(vec![
                Scope::empty(Statement::seq(
                    Statement::Command(Command::Assume(e)),
                    Statement::Command(Command::Return(vec![Expression::BoolValue(true)])),
                )),
                Scope::empty(Statement::seq(
                    Statement::Command(Command::Assume(negated)),
                    Statement::Command(Command::Return(vec![Expression::BoolValue(false)])),
                )),
            ])
        }
        Statement::Command(cmd) => Statement::Command(cmd),
        Statement::Sequence(first, second) => {
            Statement::Sequence(Box::new(simplify_returns(*first)), Box::new(simplify_returns(*second)))
        }
        Statement::Scope(scope) => Statement::Scope(simplify_returns_scope(scope)),
        Statement::Atomic(scope) => Statement::Atomic(simplify_returns_scope(scope)),
        Statement::Choice(branches) => {
            Statement::Choice(branches.into_iter().map(simplify_returns_scope).collect())
        }
        Statement::Loop(scope) => Statement::Loop(simplify_returns_scope(scope)),
        Statement::While(guard, scope) => Statement::While(guard, simplify_returns_scope(scope)),
        Statement::DoWhile(scope, guard) => Statement::DoWhile(simplify_returns_scope(scope), guard),
        Statement::IfThenElse(guard, then_branch, else_branch) => Statement::IfThenElse(
            guard,
            simplify_returns_scope(then_branch),
            simplify_returns_scope(else_branch),
        ),
    }
}

fn simplify_returns_scope(scope: Scope) -> Scope {
    Scope {
        variables: scope.variables,
        body: Box::new(simplify_returns(*scope.body)),
    }
}

fn needs_simplification(exprs: &[Expression]) -> bool {
    exprs.len() == 1 && exprs[0].sort() == Sort::Bool && !exprs[0].is_simple()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{Type, VariableDeclaration};

    #[test]
    fn trivial_return_is_untouched() {
        let decl = VariableDeclaration::new("flag", Type::bool(), false);
        let stmt = Statement::Command(Command::Return(vec![Expression::var(&decl)]));
        let rewritten = simplify_returns(stmt);
        assert!(matches!(rewritten, Statement::Command(Command::Return(_))));
    }

    #[test]
    fn compound_boolean_return_becomes_choice() {
        let decl = VariableDeclaration::new("flag", Type::bool(), false);
        let compound = Expression::and(Expression::var(&decl), Expression::BoolValue(true));
        let stmt = Statement::Command(Command::Return(vec![compound]));
        let rewritten = simplify_returns(stmt);
        assert!(matches!(rewritten, Statement::Choice(branches) if branches.len() == 2));
    }
}
