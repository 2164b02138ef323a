//! Generic read-only traversal over [`Statement`] trees.
//!
//! The original system dispatches per node kind through a C++ visitor
//! hierarchy (`cola::Visitor`, `cola::ProgramVisitor`, ...); Rust's
//! exhaustive `match` over the `Statement`/`Command` enums already gives
//! every consumer a compile error when a new kind is added, so passes in
//! `crate::normalize` and `crate::solver` mostly just `match` directly.
//! This module holds the one generic fold that is reused in more than one
//! place: visiting every leaf [`Command`] in program order.

use crate::ast::command::Command;
use crate::ast::stmt::{Scope, Statement};

/// Calls `visit` once for every leaf command in `stmt`, in program order
/// (both branches of a `Choice`/`IfThenElse` are visited, as are `While`
/// and `DoWhile` bodies — this is a static, not dynamic, traversal).
pub fn walk_statement<'a>(stmt: &'a Statement, visit: &mut impl FnMut(&'a Command)) {
    match stmt {
        Statement::Command(cmd) => visit(cmd),
        Statement::Sequence(first, second) => {
            walk_statement(first, visit);
            walk_statement(second, visit);
        }
        Statement::Scope(scope) | Statement::Atomic(scope) | Statement::Loop(scope) => {
            walk_scope(scope, visit);
        }
        Statement::Choice(branches) => {
            for branch in branches {
                walk_scope(branch, visit);
            }
        }
        Statement::While(_, scope) | Statement::DoWhile(scope, _) => walk_scope(scope, visit),
        Statement::IfThenElse(_, then_branch, else_branch) => {
            walk_scope(then_branch, visit);
            walk_scope(else_branch, visit);
        }
    }
}

fn walk_scope<'a>(scope: &'a Scope, visit: &mut impl FnMut(&'a Command)) {
    walk_statement(&scope.body, visit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::Expression;

    #[test]
    fn walk_visits_every_leaf_in_order() {
        let stmt = Statement::seq(
            Statement::Command(Command::Skip),
            Statement::Choice(vec![
                Scope::empty(Statement::Command(Command::Break)),
                Scope::empty(Statement::Command(Command::Continue)),
            ]),
        );
        let mut seen = Vec::new();
        walk_statement(&stmt, &mut |cmd| seen.push(format!("{cmd}")));
        assert_eq!(seen, vec!["skip", "break", "continue"]);
        let _ = Expression::BoolValue(true);
    }
}
