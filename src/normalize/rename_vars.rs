//! Pass 6: `rename_variables`, grounded on
//! `src/cola/transform/renameVars.cpp`.
//!
//! A nested scope's declaration whose name is already visible from an
//! enclosing scope, the parameter list, or the global set is replaced by a
//! fresh declaration whose name is the original prefixed with an
//! underscore; every reference to the old declaration is substituted for
//! the new one throughout the function. Declarations are never mutated in
//! place — there is no interior mutability on `VariableDeclaration`, and
//! §9's design note rules out shared-mutable-AST-node patterns anyway — so
//! a "rename" is really "replace with a fresh declaration everywhere it
//! occurs". Clashes are re-detected and re-resolved to a fixed point (an
//! underscore-prefixed name can itself collide with a deeper declaration)
//! capped at 20 rounds, matching the original's iteration limit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ast::command::{CasElement, Command};
use crate::ast::expr::Expression;
use crate::ast::stmt::{Function, Scope, Statement};
use crate::ast::types::VariableDeclaration;
use crate::error::TransformationError;

const MAX_ROUNDS: usize = 20;

pub fn rename_variables(
    function: Function,
    globals: &[Arc<VariableDeclaration>],
) -> Result<Function, TransformationError> {
    let global_names: HashSet<String> = globals.iter().map(|d| d.name.clone()).collect();
    let mut function = function;
    for _ in 0..MAX_ROUNDS {
        let clashes = collect_clashes(&function, &global_names);
        if clashes.is_empty() {
            return Ok(function);
        }
        let subst: HashMap<usize, Arc<VariableDeclaration>> = clashes
            .into_iter()
            .map(|decl| {
                let fresh = VariableDeclaration::new(
                    format!("_{}", decl.name),
                    decl.ty.clone(),
                    decl.is_shared,
                );
                (decl.id(), fresh)
            })
            .collect();
        function = substitute_function(&function, &subst);
    }
    Err(TransformationError::RenamingDidNotConverge {
        function: function.name.clone(),
        rounds: MAX_ROUNDS,
    })
}

fn is_visible(visible: &[HashSet<String>], name: &str) -> bool {
    visible.iter().any(|frame| frame.contains(name))
}

fn collect_clashes(
    function: &Function,
    global_names: &HashSet<String>,
) -> Vec<Arc<VariableDeclaration>> {
    let mut visible: Vec<HashSet<String>> = vec![global_names.clone()];
    let mut clashes = Vec::new();

    let mut param_frame = HashSet::new();
    for decl in &function.parameters {
        if is_visible(&visible, &decl.name) {
            clashes.push(decl.clone());
        }
        param_frame.insert(decl.name.clone());
    }
    visible.push(param_frame);

    walk_scope_for_clashes(&function.body, &mut visible, &mut clashes);
    clashes
}

fn walk_scope_for_clashes(
    scope: &Scope,
    visible: &mut Vec<HashSet<String>>,
    clashes: &mut Vec<Arc<VariableDeclaration>>,
) {
    let mut frame = HashSet::new();
    for decl in &scope.variables {
        if is_visible(visible, &decl.name) {
            clashes.push(decl.clone());
        }
        frame.insert(decl.name.clone());
    }
    visible.push(frame);
    walk_statement_for_clashes(&scope.body, visible, clashes);
    visible.pop();
}

fn walk_statement_for_clashes(
    stmt: &Statement,
    visible: &mut Vec<HashSet<String>>,
    clashes: &mut Vec<Arc<VariableDeclaration>>,
) {
    match stmt {
        Statement::Command(_) => {}
        Statement::Sequence(first, second) => {
            walk_statement_for_clashes(first, visible, clashes);
            walk_statement_for_clashes(second, visible, clashes);
        }
        Statement::Scope(scope) | Statement::Atomic(scope) | Statement::Loop(scope) => {
            walk_scope_for_clashes(scope, visible, clashes)
        }
        Statement::Choice(branches) => {
            for branch in branches {
                walk_scope_for_clashes(branch, visible, clashes);
            }
        }
        Statement::While(_, scope) | Statement::DoWhile(scope, _) => {
            walk_scope_for_clashes(scope, visible, clashes)
        }
        Statement::IfThenElse(_, then_branch, else_branch) => {
            walk_scope_for_clashes(then_branch, visible, clashes);
            walk_scope_for_clashes(else_branch, visible, clashes);
        }
    }
}

/// Maps a declaration's identity to its replacement. Reused by
/// `crate::normalize::macro_inline`, which mints fresh per-call-site locals
/// the same way a renaming round mints fresh per-clash ones.
pub(crate) type Subst = HashMap<usize, Arc<VariableDeclaration>>;

fn substitute_function(function: &Function, subst: &Subst) -> Function {
    Function {
        name: function.name.clone(),
        kind: function.kind,
        parameters: substitute_decls(&function.parameters, subst),
        returns: substitute_decls(&function.returns, subst),
        body: substitute_scope(&function.body, subst),
    }
}

pub(crate) fn substitute_decl(decl: &Arc<VariableDeclaration>, subst: &Subst) -> Arc<VariableDeclaration> {
    subst.get(&decl.id()).cloned().unwrap_or_else(|| decl.clone())
}

pub(crate) fn substitute_decls(decls: &[Arc<VariableDeclaration>], subst: &Subst) -> Vec<Arc<VariableDeclaration>> {
    decls.iter().map(|d| substitute_decl(d, subst)).collect()
}

pub(crate) fn substitute_scope(scope: &Scope, subst: &Subst) -> Scope {
    Scope {
        variables: substitute_decls(&scope.variables, subst),
        body: Box::new(substitute_statement(&scope.body, subst)),
    }
}

fn substitute_statement(stmt: &Statement, subst: &Subst) -> Statement {
    match stmt {
        Statement::Command(cmd) => Statement::Command(substitute_command(cmd, subst)),
        Statement::Sequence(first, second) => Statement::Sequence(
            Box::new(substitute_statement(first, subst)),
            Box::new(substitute_statement(second, subst)),
        ),
        Statement::Scope(scope) => Statement::Scope(substitute_scope(scope, subst)),
        Statement::Atomic(scope) => Statement::Atomic(substitute_scope(scope, subst)),
        Statement::Choice(branches) => {
            Statement::Choice(branches.iter().map(|s| substitute_scope(s, subst)).collect())
        }
        Statement::Loop(scope) => Statement::Loop(substitute_scope(scope, subst)),
        Statement::While(guard, scope) => {
            Statement::While(substitute_expr(guard, subst), substitute_scope(scope, subst))
        }
        Statement::DoWhile(scope, guard) => {
            Statement::DoWhile(substitute_scope(scope, subst), substitute_expr(guard, subst))
        }
        Statement::IfThenElse(guard, then_branch, else_branch) => Statement::IfThenElse(
            substitute_expr(guard, subst),
            substitute_scope(then_branch, subst),
            substitute_scope(else_branch, subst),
        ),
    }
}

fn substitute_expr(expr: &Expression, subst: &Subst) -> Expression {
    match expr {
        Expression::Variable(decl) => Expression::Variable(substitute_decl(decl, subst)),
        Expression::Dereference(base, field) => {
            Expression::Dereference(Box::new(substitute_expr(base, subst)), field.clone())
        }
        Expression::Negated(inner) => Expression::Negated(Box::new(substitute_expr(inner, subst))),
        Expression::Binary(op, lhs, rhs) => Expression::Binary(
            *op,
            Box::new(substitute_expr(lhs, subst)),
            Box::new(substitute_expr(rhs, subst)),
        ),
        other @ (Expression::BoolValue(_)
        | Expression::NullValue
        | Expression::MinValue
        | Expression::MaxValue
        | Expression::Symbolic(_)) => other.clone(),
    }
}

fn substitute_command(cmd: &Command, subst: &Subst) -> Command {
    match cmd {
        Command::Skip => Command::Skip,
        Command::Break => Command::Break,
        Command::Continue => Command::Continue,
        Command::Assume(e) => Command::Assume(substitute_expr(e, subst)),
        Command::Assert(e) => Command::Assert(substitute_expr(e, subst)),
        Command::Return(es) => Command::Return(es.iter().map(|e| substitute_expr(e, subst)).collect()),
        Command::Malloc(lhs) => Command::Malloc(substitute_decl(lhs, subst)),
        Command::Assignment(lhs, rhs) => {
            Command::Assignment(substitute_decl(lhs, subst), substitute_expr(rhs, subst))
        }
        Command::ParallelAssignment(lhs, rhs) => Command::ParallelAssignment(
            substitute_decls(lhs, subst),
            rhs.iter().map(|e| substitute_expr(e, subst)).collect(),
        ),
        Command::MemoryRead { lhs, base, field } => Command::MemoryRead {
            lhs: substitute_decls(lhs, subst),
            base: base.iter().map(|e| substitute_expr(e, subst)).collect(),
            field: field.clone(),
        },
        Command::MemoryWrite { base, field, value } => Command::MemoryWrite {
            base: substitute_expr(base, subst),
            field: field.clone(),
            value: substitute_expr(value, subst),
        },
        Command::CompareAndSwap { result, elements } => Command::CompareAndSwap {
            result: substitute_decl(result, subst),
            elements: elements
                .iter()
                .map(|e| CasElement {
                    dst: substitute_expr(&e.dst, subst),
                    cmp: substitute_expr(&e.cmp, subst),
                    src: substitute_expr(&e.src, subst),
                })
                .collect(),
        },
        Command::MacroCall { callee, lhs, args } => Command::MacroCall {
            callee: callee.clone(),
            lhs: substitute_decls(lhs, subst),
            args: args.iter().map(|e| substitute_expr(e, subst)).collect(),
        },
    }
}
