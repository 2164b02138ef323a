//! Pass 1: `remove_conditional_branching`, grounded on
//! `src/cola/transform/rmConditionalBranches.cpp`.

use crate::ast::command::Command;
use crate::ast::expr::negate;
use crate::ast::stmt::{Scope, Statement};

/// Rewrites every `if e then S1 else S2` into
/// `choice { { assume(e); S1 } | { assume(!e); S2 } }`, recursively.
pub fn remove_conditional_branching(stmt: Statement) -> Statement {
    match stmt {
        Statement::IfThenElse(guard, then_branch, else_branch) => {
            let then_branch = remove_conditional_branching_scope(then_branch);
            let else_branch = remove_conditional_branching_scope(else_branch);
            let negated_guard = negate(&guard);
            Statement::Choice(vec![
                prefix_assume(guard, then_branch),
                prefix_assume(negated_guard, else_branch),
            ])
        }
        Statement::Sequence(first, second) => Statement::Sequence(
            Box::new(remove_conditional_branching(*first)),
            Box::new(remove_conditional_branching(*second)),
        ),
        Statement::Scope(scope) => Statement::Scope(remove_conditional_branching_scope(scope)),
        Statement::Atomic(scope) => Statement::Atomic(remove_conditional_branching_scope(scope)),
        Statement::Choice(branches) => Statement::Choice(
            branches.into_iter().map(remove_conditional_branching_scope).collect(),
        ),
        Statement::Loop(scope) => Statement::Loop(remove_conditional_branching_scope(scope)),
        Statement::While(guard, scope) => {
            Statement::While(guard, remove_conditional_branching_scope(scope))
        }
        Statement::DoWhile(scope, guard) => {
            Statement::DoWhile(remove_conditional_branching_scope(scope), guard)
        }
        Statement::Command(cmd) => Statement::Command(cmd),
    }
}

fn remove_conditional_branching_scope(scope: Scope) -> Scope {
    Scope {
        variables: scope.variables,
        body: Box::new(remove_conditional_branching(*scope.body)),
    }
}

fn prefix_assume(guard: crate::ast::expr::Expression, branch: Scope) -> Scope {
    Scope {
        variables: branch.variables,
        body: Box::new(Statement::seq(
            Statement::Command(Command::Assume(guard)),
            *branch.body,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::Expression;
    use crate::ast::types::{Type, VariableDeclaration};

    #[test]
    fn if_then_else_becomes_choice_of_assumes() {
        let flag = VariableDeclaration::new("flag", Type::bool(), false);
        let guard = Expression::var(&flag);
        let stmt = Statement::IfThenElse(
            guard,
            Scope::empty(Statement::Command(Command::Break)),
            Scope::empty(Statement::Command(Command::Continue)),
        );
        let rewritten = remove_conditional_branching(stmt);
        match rewritten {
            Statement::Choice(branches) => {
                assert_eq!(branches.len(), 2);
                match &*branches[0].body {
                    Statement::Sequence(first, second) => {
                        assert!(matches!(**first, Statement::Command(Command::Assume(_))));
                        assert!(matches!(**second, Statement::Command(Command::Break)));
                    }
                    _ => panic!("expected assume; break"),
                }
            }
            _ => panic!("expected a Choice"),
        }
    }
}
