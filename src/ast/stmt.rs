//! Statements, scopes, functions and programs (spec.md §3).

use std::sync::Arc;

use crate::ast::command::{copy_command, Command};
use crate::ast::expr::Expression;
use crate::ast::types::VariableDeclaration;

/// A lexical scope: zero or more locally-introduced declarations plus the
/// statement they govern. `Atomic`, `Choice`, `Loop`, `While`, `DoWhile` and
/// `IfThenElse` all hold their bodies as a `Scope` rather than a bare
/// `Statement`, mirroring the original `cola::Scope` node — this is what lets
/// `remove_useless_scopes` (§4.1 pass 5) special-case "a scope introduced by
/// one of these constructs is never spliced away even when empty", as
/// opposed to a bare `Statement::Scope` nested in a `Sequence`, which is.
#[derive(Debug, Clone)]
pub struct Scope {
    pub variables: Vec<Arc<VariableDeclaration>>,
    pub body: Box<Statement>,
}

impl Scope {
    pub fn new(variables: Vec<Arc<VariableDeclaration>>, body: Statement) -> Self {
        Scope {
            variables,
            body: Box::new(body),
        }
    }

    pub fn empty(body: Statement) -> Self {
        Scope::new(Vec::new(), body)
    }
}

/// A program statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Command(Command),
    Sequence(Box<Statement>, Box<Statement>),
    /// A bare nested scope (as opposed to one owned by a control construct).
    /// This is the variant `remove_useless_scopes` may splice away.
    Scope(Scope),
    Atomic(Scope),
    /// Non-deterministic choice among branches (`choose { ... } or { ... }`).
    Choice(Vec<Scope>),
    /// Unconditional loop (`loop { ... }`), exited only via `break`.
    Loop(Scope),
    While(Expression, Scope),
    /// Runs the body once unconditionally before looping on the guard
    /// (`remove_conditional_loops`, §4.1 pass 4, eliminates this variant by
    /// unrolling the first iteration).
    DoWhile(Scope, Expression),
    /// `remove_conditional_branching` (§4.1 pass 1) eliminates this variant
    /// by rewriting to `choice` guarded by `assume`/`assume(negate(...))`.
    IfThenElse(Expression, Scope, Scope),
}

impl Statement {
    pub fn seq(first: Statement, second: Statement) -> Statement {
        Statement::Sequence(Box::new(first), Box::new(second))
    }

    /// Chains a sequence of statements, skipping the need for a trailing
    /// `Skip` sentinel. Returns `Command(Skip)` for an empty slice.
    pub fn block(stmts: Vec<Statement>) -> Statement {
        let mut iter = stmts.into_iter().rev();
        let Some(mut acc) = iter.next() else {
            return Statement::Command(Command::Skip);
        };
        for stmt in iter {
            acc = Statement::seq(stmt, acc);
        }
        acc
    }
}

/// Deep structural copy, grounded on `src/cola/util/cpStmt.cpp`.
pub fn copy_statement(stmt: &Statement) -> Statement {
    match stmt {
        Statement::Command(cmd) => Statement::Command(copy_command(cmd)),
        Statement::Sequence(first, second) => {
            Statement::Sequence(Box::new(copy_statement(first)), Box::new(copy_statement(second)))
        }
        Statement::Scope(scope) => Statement::Scope(copy_scope(scope)),
        Statement::Atomic(scope) => Statement::Atomic(copy_scope(scope)),
        Statement::Choice(branches) => Statement::Choice(branches.iter().map(copy_scope).collect()),
        Statement::Loop(scope) => Statement::Loop(copy_scope(scope)),
        Statement::While(guard, scope) => {
            Statement::While(crate::ast::expr::copy_expr(guard), copy_scope(scope))
        }
        Statement::DoWhile(scope, guard) => {
            Statement::DoWhile(copy_scope(scope), crate::ast::expr::copy_expr(guard))
        }
        Statement::IfThenElse(guard, then_branch, else_branch) => Statement::IfThenElse(
            crate::ast::expr::copy_expr(guard),
            copy_scope(then_branch),
            copy_scope(else_branch),
        ),
    }
}

fn copy_scope(scope: &Scope) -> Scope {
    Scope {
        variables: scope.variables.clone(),
        body: Box::new(copy_statement(&scope.body)),
    }
}

/// Whether a function is part of the interface under verification, a
/// reusable macro body inlined before normalization, or the program
/// initializer (run once, sequentially, before any interface call).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Interface,
    Macro,
    Init,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub kind: FunctionKind,
    pub parameters: Vec<Arc<VariableDeclaration>>,
    pub returns: Vec<Arc<VariableDeclaration>>,
    pub body: Scope,
}

/// A whole program: global (shared) variable declarations, an initializer
/// run once, and the set of functions (`Interface`-kind functions are what
/// the verifier checks; `Macro`-kind functions are inlined away by
/// normalization and never reach the solver).
#[derive(Debug, Clone)]
pub struct Program {
    pub globals: Vec<Arc<VariableDeclaration>>,
    pub initializer: Scope,
    pub functions: Vec<Function>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn interface_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions
            .iter()
            .filter(|f| f.kind == FunctionKind::Interface)
    }
}
