//! Macro inlining, the un-numbered step spec.md's pass 6 description folds
//! into "renaming ... through macro inlining". Run between pass 5
//! (`remove_useless_scopes`) and pass 6 (`rename_variables`): by the time it
//! runs, every `Command::MacroCall` is spliced into a copy of the callee's
//! body, so pass 6 only ever has to rename plain declarations, never chase
//! call sites.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::command::Command;
use crate::ast::expr::Expression;
use crate::ast::stmt::{Function, FunctionKind, Program, Scope, Statement};
use crate::ast::types::VariableDeclaration;
use crate::normalize::rename_vars::{substitute_decls, substitute_scope, Subst};

pub fn inline_macros(program: &Program) -> Program {
    let macros: HashMap<&str, &Function> = program
        .functions
        .iter()
        .filter(|f| f.kind == FunctionKind::Macro)
        .map(|f| (f.name.as_str(), f))
        .collect();

    let functions = program
        .functions
        .iter()
        .filter(|f| f.kind != FunctionKind::Macro)
        .map(|f| Function {
            name: f.name.clone(),
            kind: f.kind,
            parameters: f.parameters.clone(),
            returns: f.returns.clone(),
            body: inline_in_scope(&f.body, &macros),
        })
        .collect();

    Program {
        globals: program.globals.clone(),
        initializer: inline_in_scope(&program.initializer, &macros),
        functions,
    }
}

fn inline_in_scope(scope: &Scope, macros: &HashMap<&str, &Function>) -> Scope {
    Scope {
        variables: scope.variables.clone(),
        body: Box::new(inline_in_statement(&scope.body, macros)),
    }
}

fn inline_in_statement(stmt: &Statement, macros: &HashMap<&str, &Function>) -> Statement {
    match stmt {
        Statement::Command(Command::MacroCall { callee, lhs, args }) => {
            let callee_fn = *macros
                .get(callee.as_str())
                .unwrap_or_else(|| panic!("macro `{callee}` is not declared"));
            // A macro's own body may itself call other macros; the
            // substituted copy goes through the same inlining before it is
            // spliced in, so nested macro calls are fully expanded too.
            inline_in_statement(&inline_call(callee_fn, lhs, args), macros)
        }
        Statement::Command(cmd) => Statement::Command(cmd.clone()),
        Statement::Sequence(first, second) => Statement::Sequence(
            Box::new(inline_in_statement(first, macros)),
            Box::new(inline_in_statement(second, macros)),
        ),
        Statement::Scope(scope) => Statement::Scope(inline_in_scope(scope, macros)),
        Statement::Atomic(scope) => Statement::Atomic(inline_in_scope(scope, macros)),
        Statement::Choice(branches) => {
            Statement::Choice(branches.iter().map(|s| inline_in_scope(s, macros)).collect())
        }
        Statement::Loop(scope) => Statement::Loop(inline_in_scope(scope, macros)),
        Statement::While(guard, scope) => {
            Statement::While(guard.clone(), inline_in_scope(scope, macros))
        }
        Statement::DoWhile(scope, guard) => {
            Statement::DoWhile(inline_in_scope(scope, macros), guard.clone())
        }
        Statement::IfThenElse(guard, then_branch, else_branch) => Statement::IfThenElse(
            guard.clone(),
            inline_in_scope(then_branch, macros),
            inline_in_scope(else_branch, macros),
        ),
    }
}

/// Splices in a fresh copy of `callee`'s body for one call site. Every
/// parameter and scope-declared local gets a brand-new declaration (same
/// name, new identity), so two occurrences of the same macro call never
/// alias through a shared `Arc` — each call gets its own locals, the way
/// two textually distinct invocations would if the macro had been written
/// out by hand. Parameters are bound by a leading parallel assignment from
/// `args`; `lhs` is bound from the callee's `returns` by a trailing one.
fn inline_call(callee: &Function, lhs: &[Arc<VariableDeclaration>], args: &[Expression]) -> Statement {
    let mut subst: Subst = HashMap::new();
    for param in &callee.parameters {
        let fresh = VariableDeclaration::new(param.name.clone(), param.ty.clone(), param.is_shared);
        subst.insert(param.id(), fresh);
    }
    register_fresh_locals(&callee.body, &mut subst);

    let body_scope = substitute_scope(&callee.body, &subst);
    let fresh_params = substitute_decls(&callee.parameters, &subst);
    let bound_returns = substitute_decls(&callee.returns, &subst);

    let mut stmts = Vec::new();
    if !fresh_params.is_empty() {
        stmts.push(Statement::Command(Command::ParallelAssignment(
            fresh_params.clone(),
            args.to_vec(),
        )));
    }
    stmts.push(Statement::Scope(body_scope));
    if !lhs.is_empty() {
        stmts.push(Statement::Command(Command::ParallelAssignment(
            lhs.to_vec(),
            bound_returns.into_iter().map(Expression::Variable).collect(),
        )));
    }

    Statement::Scope(Scope::new(fresh_params, Statement::block(stmts)))
}

fn register_fresh_locals(scope: &Scope, subst: &mut Subst) {
    for decl in &scope.variables {
        let fresh = VariableDeclaration::new(decl.name.clone(), decl.ty.clone(), decl.is_shared);
        subst.insert(decl.id(), fresh);
    }
    register_fresh_locals_stmt(&scope.body, subst);
}

fn register_fresh_locals_stmt(stmt: &Statement, subst: &mut Subst) {
    match stmt {
        Statement::Command(_) => {}
        Statement::Sequence(first, second) => {
            register_fresh_locals_stmt(first, subst);
            register_fresh_locals_stmt(second, subst);
        }
        Statement::Scope(scope) | Statement::Atomic(scope) | Statement::Loop(scope) => {
            register_fresh_locals(scope, subst)
        }
        Statement::Choice(branches) => {
            for branch in branches {
                register_fresh_locals(branch, subst);
            }
        }
        Statement::While(_, scope) | Statement::DoWhile(scope, _) => register_fresh_locals(scope, subst),
        Statement::IfThenElse(_, then_branch, else_branch) => {
            register_fresh_locals(then_branch, subst);
            register_fresh_locals(else_branch, subst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;

    fn swap_macro() -> Function {
        let a = VariableDeclaration::new("a", Type::data(), false);
        let b = VariableDeclaration::new("b", Type::data(), false);
        let ret = VariableDeclaration::new("tmp", Type::data(), false);
        Function {
            name: "swap".into(),
            kind: FunctionKind::Macro,
            parameters: vec![a.clone(), b.clone()],
            returns: vec![ret.clone()],
            body: Scope::new(
                vec![ret.clone()],
                Statement::Command(Command::Assignment(ret, Expression::var(&a))),
            ),
        }
    }

    #[test]
    fn macro_call_is_replaced_by_a_fresh_copy_of_its_body() {
        let x = VariableDeclaration::new("x", Type::data(), false);
        let y = VariableDeclaration::new("y", Type::data(), false);
        let out = VariableDeclaration::new("out", Type::data(), false);
        let program = Program {
            globals: vec![],
            initializer: Scope::empty(Statement::Command(Command::Skip)),
            functions: vec![
                swap_macro(),
                Function {
                    name: "f".into(),
                    kind: FunctionKind::Interface,
                    parameters: vec![],
                    returns: vec![],
                    body: Scope::new(
                        vec![x.clone(), y.clone(), out.clone()],
                        Statement::Command(Command::MacroCall {
                            callee: "swap".into(),
                            lhs: vec![out],
                            args: vec![Expression::var(&x), Expression::var(&y)],
                        }),
                    ),
                },
            ],
        };

        let inlined = inline_macros(&program);
        assert_eq!(inlined.functions.len(), 1);
        let f = &inlined.functions[0];
        match &*f.body.body {
            Statement::Scope(call_scope) => {
                assert_eq!(call_scope.variables.len(), 2);
                assert_ne!(call_scope.variables[0], program.functions[0].parameters[0]);
            }
            _ => panic!("expected the call site to become a fresh scope"),
        }
    }

    #[test]
    fn two_call_sites_get_independent_locals() {
        let out1 = VariableDeclaration::new("out1", Type::data(), false);
        let out2 = VariableDeclaration::new("out2", Type::data(), false);
        let x = VariableDeclaration::new("x", Type::data(), false);
        let call = |lhs: Arc<VariableDeclaration>| {
            Statement::Command(Command::MacroCall {
                callee: "swap".into(),
                lhs: vec![lhs],
                args: vec![Expression::var(&x), Expression::var(&x)],
            })
        };
        let program = Program {
            globals: vec![],
            initializer: Scope::empty(Statement::Command(Command::Skip)),
            functions: vec![
                swap_macro(),
                Function {
                    name: "f".into(),
                    kind: FunctionKind::Interface,
                    parameters: vec![],
                    returns: vec![],
                    body: Scope::new(
                        vec![x.clone(), out1.clone(), out2.clone()],
                        Statement::seq(call(out1), call(out2)),
                    ),
                },
            ],
        };

        let inlined = inline_macros(&program);
        let f = &inlined.functions[0];
        match &*f.body.body {
            Statement::Sequence(first, second) => {
                let params_of = |s: &Statement| match s {
                    Statement::Scope(scope) => scope.variables.clone(),
                    _ => panic!("expected a Scope"),
                };
                let p1 = params_of(first);
                let p2 = params_of(second);
                assert_ne!(p1[0], p2[0]);
            }
            _ => panic!("expected a Sequence of two inlined calls"),
        }
    }
}
