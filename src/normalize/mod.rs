//! The six-pass normalizer (spec.md §4.1) that lowers the surface language
//! down to "CoLa-light": no `if`, no compound Boolean `return`, no `CAS`, no
//! `while`/`do-while`, no vacuous nested scopes, no macro calls, and every
//! declaration in a function has a name unique within it. The solver
//! (`crate::solver`) only ever has to handle the reduced form.
//!
//! Passes run in a fixed order; macro inlining has no dedicated spec.md
//! pass number but must happen before pass 6 can give every declaration —
//! including those a macro body introduces — a final unique name.

pub mod cas;
pub mod conditional_branching;
pub mod conditional_loops;
pub mod macro_inline;
pub mod rename_vars;
pub mod returns;
pub mod useless_scopes;

use crate::ast::stmt::{Function, Program, Scope, Statement};
use crate::error::TransformationError;

pub use cas::remove_cas;
pub use conditional_branching::remove_conditional_branching;
pub use conditional_loops::remove_conditional_loops;
pub use macro_inline::inline_macros;
pub use rename_vars::rename_variables;
pub use returns::simplify_returns;
pub use useless_scopes::remove_useless_scopes;

/// Runs all six passes (plus macro inlining) over every function of
/// `program`, in program order. The function's own top-level scope — like
/// an `Atomic`/`Choice`/`Loop` body — is never itself a candidate for
/// `remove_useless_scopes`'s splicing; only bare nested scopes inside it
/// are.
pub fn normalize_program(program: Program) -> Result<Program, TransformationError> {
    let inlined = inline_macros(&program);
    let globals = inlined.globals;

    let initializer = normalize_scope(inlined.initializer, "init")?;
    let mut functions = Vec::with_capacity(inlined.functions.len());
    for function in inlined.functions {
        functions.push(normalize_function(function, &globals)?);
    }

    Ok(Program {
        globals,
        initializer,
        functions,
    })
}

fn normalize_function(
    function: Function,
    globals: &[std::sync::Arc<crate::ast::types::VariableDeclaration>],
) -> Result<Function, TransformationError> {
    let Function {
        name,
        kind,
        parameters,
        returns,
        body,
    } = function;
    let body = normalize_scope(body, &name)?;
    let function = Function {
        name,
        kind,
        parameters,
        returns,
        body,
    };
    rename_variables(function, globals)
}

/// Applies passes 1 through 5 to a scope owned by a function, or by the
/// program initializer, leaving the scope's own declarations untouched
/// (only nested bare scopes within its body are candidates for pass 5).
fn normalize_scope(scope: Scope, context: &str) -> Result<Scope, TransformationError> {
    let mut stmt: Statement = *scope.body;
    stmt = remove_conditional_branching(stmt);
    stmt = simplify_returns(stmt);
    stmt = remove_cas(stmt);
    stmt = remove_conditional_loops(stmt);
    stmt = remove_useless_scopes(stmt, context)?;
    Ok(Scope {
        variables: scope.variables,
        body: Box::new(stmt),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::command::Command;
    use crate::ast::expr::Expression;
    use crate::ast::stmt::FunctionKind;
    use crate::ast::types::{Type, VariableDeclaration};

    #[test]
    fn normalizes_a_function_with_if_and_while_and_a_macro_call() {
        let flag = VariableDeclaration::new("flag", Type::bool(), false);
        let counter = VariableDeclaration::new("counter", Type::data(), false);
        let tmp = VariableDeclaration::new("tmp", Type::data(), false);

        let bump = Function {
            name: "bump".into(),
            kind: FunctionKind::Macro,
            parameters: vec![counter.clone()],
            returns: vec![tmp.clone()],
            body: Scope::new(
                vec![tmp.clone()],
                Statement::Command(Command::Assignment(tmp, Expression::var(&counter))),
            ),
        };

        let body = Scope::new(
            vec![flag.clone(), counter.clone()],
            Statement::seq(
                Statement::IfThenElse(
                    Expression::var(&flag),
                    Scope::empty(Statement::Command(Command::MacroCall {
                        callee: "bump".into(),
                        lhs: vec![counter.clone()],
                        args: vec![Expression::var(&counter)],
                    })),
                    Scope::empty(Statement::Command(Command::Skip)),
                ),
                Statement::While(
                    Expression::var(&flag),
                    Scope::empty(Statement::Command(Command::Break)),
                ),
            ),
        );

        let program = Program {
            globals: vec![],
            initializer: Scope::empty(Statement::Command(Command::Skip)),
            functions: vec![
                bump,
                Function {
                    name: "f".into(),
                    kind: FunctionKind::Interface,
                    parameters: vec![],
                    returns: vec![],
                    body,
                },
            ],
        };

        let normalized = normalize_program(program).unwrap();
        assert_eq!(normalized.functions.len(), 1);
        let f = &normalized.functions[0];
        assert!(matches!(*f.body.body, Statement::Sequence(..)));
    }

    #[test]
    fn initializer_is_normalized_too() {
        let flag = VariableDeclaration::new("flag", Type::bool(), false);
        let program = Program {
            globals: vec![flag.clone()],
            initializer: Scope::empty(Statement::IfThenElse(
                Expression::var(&flag),
                Scope::empty(Statement::Command(Command::Skip)),
                Scope::empty(Statement::Command(Command::Skip)),
            )),
            functions: vec![],
        };
        let normalized = normalize_program(program).unwrap();
        assert!(matches!(*normalized.initializer.body, Statement::Choice(_)));
    }
}
