//! Pass 4: `remove_conditional_loops` (spec.md §4.1 item 4).

use crate::ast::command::Command;
use crate::ast::expr::negate;
use crate::ast::stmt::{Scope, Statement};

/// Desugars `while e do S` to `loop { choice { assume(e); S | assume(!e); break } }`
/// and `do S while e` to the same loop with one copy of `S` run first
/// (the original semantics: the body runs once unconditionally, then the
/// loop begins).
pub fn remove_conditional_loops(stmt: Statement) -> Statement {
    match stmt {
        Statement::While(guard, scope) => {
            let scope = remove_conditional_loops_scope(scope);
            loop_of_guarded_body(guard, scope)
        }
        Statement::DoWhile(scope, guard) => {
            let scope = remove_conditional_loops_scope(scope);
            let first_iteration = crate::ast::stmt::copy_statement(&scope.body);
            let loop_stmt = loop_of_guarded_body(guard, scope);
            Statement::seq(first_iteration, loop_stmt)
        }
        Statement::Command(cmd) => Statement::Command(cmd),
        Statement::Sequence(first, second) => Statement::Sequence(
            Box::new(remove_conditional_loops(*first)),
            Box::new(remove_conditional_loops(*second)),
        ),
        Statement::Scope(scope) => Statement::Scope(remove_conditional_loops_scope(scope)),
        Statement::Atomic(scope) => Statement::Atomic(remove_conditional_loops_scope(scope)),
        Statement::Choice(branches) => {
            Statement::Choice(branches.into_iter().map(remove_conditional_loops_scope).collect())
        }
        Statement::Loop(scope) => Statement::Loop(remove_conditional_loops_scope(scope)),
        Statement::IfThenElse(guard, then_branch, else_branch) => Statement::IfThenElse(
            guard,
            remove_conditional_loops_scope(then_branch),
            remove_conditional_loops_scope(else_branch),
        ),
    }
}

fn loop_of_guarded_body(guard: crate::ast::expr::Expression, scope: Scope) -> Statement {
    let negated = negate(&guard);
    let run_body = Statement::seq(Statement::Command(Command::Assume(guard)), *scope.body);
    let exit = Statement::seq(
        Statement::Command(Command::Assume(negated)),
        Statement::Command(Command::Break),
    );
    Statement::Loop(Scope::empty(Statement::Choice(vec![
        Scope::new(scope.variables, run_body),
        Scope::empty(exit),
    ])))
}

fn remove_conditional_loops_scope(scope: Scope) -> Scope {
    Scope {
        variables: scope.variables,
        body: Box::new(remove_conditional_loops(*scope.body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::Expression;
    use crate::ast::types::{Type, VariableDeclaration};

    #[test]
    fn while_becomes_loop_with_guarded_choice() {
        let flag = VariableDeclaration::new("flag", Type::bool(), false);
        let stmt = Statement::While(
            Expression::var(&flag),
            Scope::empty(Statement::Command(Command::Skip)),
        );
        let rewritten = remove_conditional_loops(stmt);
        match rewritten {
            Statement::Loop(scope) => {
                assert!(matches!(*scope.body, Statement::Choice(ref b) if b.len() == 2));
            }
            _ => panic!("expected a Loop"),
        }
    }

    #[test]
    fn do_while_runs_body_once_before_the_loop() {
        let flag = VariableDeclaration::new("flag", Type::bool(), false);
        let stmt = Statement::DoWhile(
            Scope::empty(Statement::Command(Command::Break)),
            Expression::var(&flag),
        );
        let rewritten = remove_conditional_loops(stmt);
        match rewritten {
            Statement::Sequence(first, second) => {
                assert!(matches!(*first, Statement::Command(Command::Break)));
                assert!(matches!(*second, Statement::Loop(_)));
            }
            _ => panic!("expected Sequence(body, loop)"),
        }
    }
}
