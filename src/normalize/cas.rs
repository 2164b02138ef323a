//! Pass 3: `remove_cas` (spec.md §4.1 item 3).

use crate::ast::command::Command;
use crate::ast::expr::Expression;
use crate::ast::stmt::{Scope, Statement};

/// Rewrites `result = CAS(<dst_1,cmp_1,src_1>, ..., <dst_n,cmp_n,src_n>)`
/// into an atomic choice: the success branch assumes every `dst_i == cmp_i`,
/// commits every element's update, and sets `result = true`; the failure
/// branch assumes the negation of that conjunction and sets `result = false`.
/// The atomic boundary the command implicitly carried is preserved by
/// wrapping the whole rewrite in `Statement::Atomic`.
///
/// An element's destination is either a plain variable or a field
/// dereference (spec.md §8 boundary scenario 4, e.g. `CAS(<p.next,c,n>)`).
/// Plain-variable destinations are batched into one `ParallelAssignment` so
/// they commit simultaneously, the same as before; a dereference destination
/// has no such combinator (there is no parallel-memory-write command), so
/// each becomes its own `MemoryWrite` — harmless since elements never read
/// a field another element just wrote, they only reference program
/// variables, which the writes never touch.
pub fn remove_cas(stmt: Statement) -> Statement {
    match stmt {
        Statement::Command(Command::CompareAndSwap { result, elements }) => {
            let conjunction = elements
                .iter()
                .map(|e| Expression::eq(e.dst.clone(), e.cmp.clone()))
                .reduce(Expression::and)
                .unwrap_or(Expression::BoolValue(true));
            let negated = crate::ast::expr::negate(&conjunction);

            let mut writes = Vec::new();
            let mut var_dsts = Vec::new();
            let mut var_srcs = Vec::new();
            for e in &elements {
                match &e.dst {
                    Expression::Variable(decl) => {
                        var_dsts.push(decl.clone());
                        var_srcs.push(e.src.clone());
                    }
                    Expression::Dereference(base, field) => {
                        writes.push(Statement::Command(Command::MemoryWrite {
                            base: base.as_ref().clone(),
                            field: field.clone(),
                            value: e.src.clone(),
                        }));
                    }
                    _ => panic!("CAS destination must be a variable or a field dereference"),
                }
            }

            let mut success_steps = vec![Statement::Command(Command::Assume(conjunction))];
            success_steps.extend(writes);
            if !var_dsts.is_empty() {
                success_steps.push(Statement::Command(Command::ParallelAssignment(var_dsts, var_srcs)));
            }
            success_steps.push(Statement::Command(Command::Assignment(result.clone(), Expression::BoolValue(true))));
            let success = Statement::block(success_steps);

            let failure = Statement::block(vec![
                Statement::Command(Command::Assume(negated)),
                Statement::Command(Command::Assignment(result, Expression::BoolValue(false))),
            ]);

            Statement::Atomic(Scope::empty(Statement::Choice(vec![
                Scope::empty(success),
                Scope::empty(failure),
            ])))
        }
        Statement::Command(cmd) => Statement::Command(cmd),
        Statement::Sequence(first, second) => {
            Statement::Sequence(Box::new(remove_cas(*first)), Box::new(remove_cas(*second)))
        }
        Statement::Scope(scope) => Statement::Scope(remove_cas_scope(scope)),
        Statement::Atomic(scope) => Statement::Atomic(remove_cas_scope(scope)),
        Statement::Choice(branches) => Statement::Choice(branches.into_iter().map(remove_cas_scope).collect()),
        Statement::Loop(scope) => Statement::Loop(remove_cas_scope(scope)),
        Statement::While(guard, scope) => Statement::While(guard, remove_cas_scope(scope)),
        Statement::DoWhile(scope, guard) => Statement::DoWhile(remove_cas_scope(scope), guard),
        Statement::IfThenElse(guard, then_branch, else_branch) => {
            Statement::IfThenElse(guard, remove_cas_scope(then_branch), remove_cas_scope(else_branch))
        }
    }
}

fn remove_cas_scope(scope: Scope) -> Scope {
    Scope {
        variables: scope.variables,
        body: Box::new(remove_cas(*scope.body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::command::CasElement;
    use crate::ast::types::{Type, VariableDeclaration};

    #[test]
    fn single_element_cas_becomes_atomic_choice() {
        let ptr_ty = Type::new("Node", crate::ast::types::Sort::Pointer);
        let dst = VariableDeclaration::new("head", ptr_ty.clone(), true);
        let result = VariableDeclaration::new("ok", Type::bool(), false);
        let stmt = Statement::Command(Command::CompareAndSwap {
            result,
            elements: vec![CasElement {
                dst: Expression::var(&dst),
                cmp: Expression::NullValue,
                src: Expression::NullValue,
            }],
        });
        let rewritten = remove_cas(stmt);
        match rewritten {
            Statement::Atomic(scope) => {
                assert!(matches!(*scope.body, Statement::Choice(ref b) if b.len() == 2));
            }
            _ => panic!("expected an atomic block"),
        }
    }

    /// spec.md §8 boundary scenario 4: `b = CAS(<p.next,c,n>)`. A dereference
    /// destination has no plain-variable `Arc<VariableDeclaration>` to put in
    /// a `ParallelAssignment`, so the success branch must carry a
    /// `MemoryWrite` to `p.next` instead of panicking.
    #[test]
    fn dereference_destination_becomes_a_memory_write() {
        let ptr_ty = Type::new("Node", crate::ast::types::Sort::Pointer);
        let p = VariableDeclaration::new("p", ptr_ty.clone(), false);
        let c = VariableDeclaration::new("c", ptr_ty.clone(), false);
        let n = VariableDeclaration::new("n", ptr_ty, false);
        let result = VariableDeclaration::new("b", Type::bool(), false);
        let stmt = Statement::Command(Command::CompareAndSwap {
            result,
            elements: vec![CasElement {
                dst: Expression::deref(Expression::var(&p), "next"),
                cmp: Expression::var(&c),
                src: Expression::var(&n),
            }],
        });
        let rewritten = remove_cas(stmt);
        let success = match rewritten {
            Statement::Atomic(scope) => match *scope.body {
                Statement::Choice(branches) => branches.into_iter().next().unwrap(),
                _ => panic!("expected a choice"),
            },
            _ => panic!("expected an atomic block"),
        };
        let mut steps = Vec::new();
        let mut body = *success.body;
        loop {
            match body {
                Statement::Sequence(first, second) => {
                    steps.push(*first);
                    body = *second;
                }
                other => {
                    steps.push(other);
                    break;
                }
            }
        }
        assert!(steps.iter().any(|s| matches!(s, Statement::Command(Command::MemoryWrite { field, .. }) if field == "next")));
        assert!(!steps.iter().any(|s| matches!(s, Statement::Command(Command::ParallelAssignment(..)))));
    }
}
