//! Pass 5: `remove_useless_scopes`, grounded on
//! `src/cola/transform/rmUselessScopes.cpp`.

use crate::ast::stmt::{Scope, Statement};
use crate::error::TransformationError;

/// Splices away a bare `Statement::Scope` nested directly inside a
/// `Sequence`/`Scope` when it declares no local variables. A scope that does
/// declare locals cannot be spliced at that position (there is nowhere to
/// hoist the declarations to) and is a transformation error — the original
/// throws here rather than silently keeping the nested scope.
///
/// Scopes owned by `Atomic`/`Choice`/`Loop`/`While`/`DoWhile`/`IfThenElse`
/// are never subject to removal, empty or not: they are the boundary the
/// construct itself needs, not an incidental nesting.
pub fn remove_useless_scopes(
    stmt: Statement,
    function: &str,
) -> Result<Statement, TransformationError> {
    match stmt {
        Statement::Scope(scope) => {
            let body = remove_useless_scopes(*scope.body, function)?;
            if scope.variables.is_empty() {
                Ok(body)
            } else {
                Err(TransformationError::UselessScopeNotRemovable {
                    function: function.to_string(),
                })
            }
        }
        Statement::Sequence(first, second) => Ok(Statement::Sequence(
            Box::new(remove_useless_scopes(*first, function)?),
            Box::new(remove_useless_scopes(*second, function)?),
        )),
        Statement::Atomic(scope) => Ok(Statement::Atomic(remove_in_owned_scope(scope, function)?)),
        Statement::Choice(branches) => {
            let branches = branches
                .into_iter()
                .map(|scope| remove_in_owned_scope(scope, function))
                .collect::<Result<_, _>>()?;
            Ok(Statement::Choice(branches))
        }
        Statement::Loop(scope) => Ok(Statement::Loop(remove_in_owned_scope(scope, function)?)),
        Statement::While(guard, scope) => {
            Ok(Statement::While(guard, remove_in_owned_scope(scope, function)?))
        }
        Statement::DoWhile(scope, guard) => {
            Ok(Statement::DoWhile(remove_in_owned_scope(scope, function)?, guard))
        }
        Statement::IfThenElse(guard, then_branch, else_branch) => Ok(Statement::IfThenElse(
            guard,
            remove_in_owned_scope(then_branch, function)?,
            remove_in_owned_scope(else_branch, function)?,
        )),
        Statement::Command(cmd) => Ok(Statement::Command(cmd)),
    }
}

fn remove_in_owned_scope(scope: Scope, function: &str) -> Result<Scope, TransformationError> {
    Ok(Scope {
        variables: scope.variables,
        body: Box::new(remove_useless_scopes(*scope.body, function)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::command::Command;
    use crate::ast::types::{Type, VariableDeclaration};

    #[test]
    fn empty_nested_scope_is_spliced_away() {
        let stmt = Statement::Sequence(
            Box::new(Statement::Scope(Scope::empty(Statement::Command(Command::Skip)))),
            Box::new(Statement::Command(Command::Break)),
        );
        let result = remove_useless_scopes(stmt, "f").unwrap();
        match result {
            Statement::Sequence(first, second) => {
                assert!(matches!(*first, Statement::Command(Command::Skip)));
                assert!(matches!(*second, Statement::Command(Command::Break)));
            }
            _ => panic!("expected the inner scope to be spliced away"),
        }
    }

    #[test]
    fn nested_scope_with_declarations_errors() {
        let decl = VariableDeclaration::new("x", Type::data(), false);
        let stmt = Statement::Scope(Scope::new(vec![decl], Statement::Command(Command::Skip)));
        let result = remove_useless_scopes(stmt, "f");
        assert!(matches!(
            result,
            Err(TransformationError::UselessScopeNotRemovable { .. })
        ));
    }

    #[test]
    fn loop_body_scope_is_preserved_even_when_empty() {
        let stmt = Statement::Loop(Scope::empty(Statement::Command(Command::Skip)));
        let result = remove_useless_scopes(stmt, "f").unwrap();
        assert!(matches!(result, Statement::Loop(_)));
    }
}
