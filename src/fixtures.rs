//! Hand-built demo programs, used by the CLI and by the integration tests
//! under `tests/` (spec.md §9 Non-goals: there is no text parser, so every
//! program reaching the verifier is assembled through this AST construction
//! API instead). Two data structures are provided: a Treiber-style stack
//! (`treiber_stack_program`) and a Michael–Harris-style sorted set
//! (`michael_set_program`), plus two deliberately broken variants exercising
//! spec.md §8 boundary scenarios 5 (malloc invariant) and 6 (variable
//! hiding).

use std::collections::BTreeMap;

use crate::ast::command::{CasElement, Command};
use crate::ast::expr::{BinaryOperator, Expression};
use crate::ast::stmt::{Function, FunctionKind, Program, Scope, Statement};
use crate::ast::types::{Sort, Type, VariableDeclaration};
use crate::config::SolverConfig;
use crate::logic::properties::make_invariant;

/// The node type both demo structures share: a pointer-sorted `next` link
/// and a data-sorted `val`.
pub fn node_type() -> Type {
    let mut fields = BTreeMap::new();
    fields.insert("next".to_string(), Type::new("Node", Sort::Pointer));
    fields.insert("val".to_string(), Type::data());
    Type::with_fields("Node", fields)
}

fn trivial_local_invariant() -> crate::logic::properties::Property {
    let node = VariableDeclaration::new("n", node_type(), false);
    make_invariant("trivially_true", node, Expression::BoolValue(true))
        .expect("a one-variable BoolValue(true) blueprint is always well-formed")
}

/// A permissive configuration: every configured invariant is trivially
/// true, so the only way verification fails is a genuine linearizability
/// defect (or an access error) in the program itself.
fn permissive_config() -> SolverConfig {
    let invariant = trivial_local_invariant();
    SolverConfig {
        flow_value_type: Type::data(),
        local_node_invariant: invariant.clone(),
        shared_node_invariant: invariant.clone(),
        outflow: vec![],
        logically_contains: invariant,
    }
}

/// A Treiber stack: one shared `head` pointer, and a `push` that allocates
/// a fresh node, stores the value, then CAS-retries linking it in as the
/// new head. Grounded on the CAS desugaring of `src/normalize/cas.rs` and
/// `Malloc`'s post-image — `push`'s freshly allocated node's `val` field is
/// unconstrained until the write that follows, which is exactly what
/// [`treiber_stack_strict_config`] exploits to exercise scenario 5.
pub fn treiber_stack_program() -> Program {
    let head = VariableDeclaration::new("head", node_type(), true);
    let value = VariableDeclaration::new("value", Type::data(), false);
    let node = VariableDeclaration::new("node", node_type(), false);
    let old = VariableDeclaration::new("old", node_type(), false);
    let ok = VariableDeclaration::new("ok", Type::bool(), false);

    let retry_loop = Statement::Loop(Scope::new(
        vec![old.clone(), ok.clone()],
        Statement::block(vec![
            Statement::Command(Command::Assignment(old.clone(), Expression::var(&head))),
            Statement::Command(Command::MemoryWrite {
                base: Expression::var(&node),
                field: "next".into(),
                value: Expression::var(&old),
            }),
            Statement::Command(Command::CompareAndSwap {
                result: ok.clone(),
                elements: vec![CasElement {
                    dst: Expression::var(&head),
                    cmp: Expression::var(&old),
                    src: Expression::var(&node),
                }],
            }),
            Statement::IfThenElse(
                Expression::var(&ok),
                Scope::empty(Statement::Command(Command::Break)),
                Scope::empty(Statement::Command(Command::Skip)),
            ),
        ]),
    ));

    let push = Function {
        name: "push".into(),
        kind: FunctionKind::Interface,
        parameters: vec![value.clone()],
        returns: vec![],
        body: Scope::new(
            vec![node.clone()],
            Statement::block(vec![
                Statement::Command(Command::Malloc(node.clone())),
                Statement::Command(Command::MemoryWrite {
                    base: Expression::var(&node),
                    field: "val".into(),
                    value: Expression::var(&value),
                }),
                retry_loop,
                Statement::Command(Command::Return(vec![])),
            ]),
        ),
    };

    Program {
        globals: vec![head.clone()],
        initializer: Scope::empty(Statement::Command(Command::Assignment(head, Expression::NullValue))),
        functions: vec![push],
    }
}

/// The permissive configuration for [`treiber_stack_program`]: `push`
/// verifies cleanly under it.
pub fn treiber_stack_config() -> SolverConfig {
    permissive_config()
}

/// A configuration whose local-node invariant demands a freshly allocated
/// node's `val` field already equal `MIN` — something `MakeFreshCell`
/// leaves unconstrained, so `Malloc`'s post-image raises
/// `VerificationError::InvariantViolation` the instant `push` allocates its
/// node, before the following write ever runs (spec.md §8 boundary
/// scenario 5).
pub fn treiber_stack_strict_config() -> SolverConfig {
    let dummy = VariableDeclaration::new("n", node_type(), false);
    let invariant = make_invariant(
        "val_preset_to_min",
        dummy.clone(),
        Expression::eq(Expression::deref(Expression::var(&dummy), "val"), Expression::MinValue),
    )
    .expect("one-variable equality blueprint is well-formed");
    SolverConfig {
        local_node_invariant: invariant,
        ..permissive_config()
    }
}

/// A Michael–Harris-style sorted set's `contains`: walk from `head` via
/// `next`, reading each node's `val` and comparing it against `key`, until
/// either a match or the end of the list.
pub fn michael_set_program() -> Program {
    let head = VariableDeclaration::new("head", node_type(), true);
    let key = VariableDeclaration::new("key", Type::data(), false);
    let cursor = VariableDeclaration::new("cursor", node_type(), false);
    let found = VariableDeclaration::new("found", Type::bool(), false);
    let tmp = VariableDeclaration::new("tmp", Type::data(), false);

    let step_through_node = Scope::new(
        vec![tmp.clone()],
        Statement::block(vec![
            Statement::Command(Command::Assume(Expression::Binary(
                BinaryOperator::Neq,
                Box::new(Expression::var(&cursor)),
                Box::new(Expression::NullValue),
            ))),
            Statement::Command(Command::MemoryRead {
                lhs: vec![tmp.clone()],
                base: vec![Expression::var(&cursor)],
                field: vec!["val".into()],
            }),
            Statement::Choice(vec![
                Scope::empty(Statement::block(vec![
                    Statement::Command(Command::Assume(Expression::eq(Expression::var(&tmp), Expression::var(&key)))),
                    Statement::Command(Command::Assignment(found.clone(), Expression::BoolValue(true))),
                    Statement::Command(Command::Break),
                ])),
                Scope::empty(Statement::block(vec![
                    Statement::Command(Command::Assume(Expression::Negated(Box::new(Expression::eq(
                        Expression::var(&tmp),
                        Expression::var(&key),
                    ))))),
                    Statement::Command(Command::MemoryRead {
                        lhs: vec![cursor.clone()],
                        base: vec![Expression::var(&cursor)],
                        field: vec!["next".into()],
                    }),
                ])),
            ]),
        ]),
    );

    let reached_the_end = Scope::empty(Statement::block(vec![
        Statement::Command(Command::Assume(Expression::eq(Expression::var(&cursor), Expression::NullValue))),
        Statement::Command(Command::Break),
    ]));

    let traversal = Statement::Loop(Scope::new(vec![], Statement::Choice(vec![step_through_node, reached_the_end])));

    let contains = Function {
        name: "contains".into(),
        kind: FunctionKind::Interface,
        parameters: vec![key.clone()],
        returns: vec![found.clone()],
        body: Scope::new(
            vec![cursor.clone(), found.clone()],
            Statement::block(vec![
                Statement::Command(Command::Assignment(cursor.clone(), Expression::var(&head))),
                Statement::Command(Command::Assignment(found.clone(), Expression::BoolValue(false))),
                traversal,
                Statement::Command(Command::Return(vec![Expression::var(&found)])),
            ]),
        ),
    };

    Program {
        globals: vec![head.clone()],
        initializer: Scope::empty(Statement::Command(Command::Assignment(head, Expression::NullValue))),
        functions: vec![contains],
    }
}

/// The permissive configuration for [`michael_set_program`].
pub fn michael_set_config() -> SolverConfig {
    permissive_config()
}

/// A variant of `contains` whose traversal scope re-declares a variable
/// named `cursor` in a nested scope without ever leaving the outer one.
/// The outer and inner `cursor` are two distinct declarations that merely
/// share a name — not the same `Arc` — since `PostEnter`'s hiding check is
/// name-based (spec.md §8 boundary scenario 6): a fresh declaration hides an
/// outer one the moment it reuses a name still bound in an enclosing,
/// still-open scope, same as the original system's `scope.cpp` clash check.
pub fn michael_set_hiding_program() -> Program {
    let head = VariableDeclaration::new("head", node_type(), true);
    let key = VariableDeclaration::new("key", Type::data(), false);
    let outer_cursor = VariableDeclaration::new("cursor", node_type(), false);
    let inner_cursor = VariableDeclaration::new("cursor", node_type(), false);

    let inner = Scope::new(vec![inner_cursor], Statement::Command(Command::Skip));
    let outer = Scope::new(vec![outer_cursor], Statement::Scope(inner));

    let contains = Function {
        name: "contains".into(),
        kind: FunctionKind::Interface,
        parameters: vec![key],
        returns: vec![],
        body: Scope::new(vec![], Statement::Scope(outer)),
    };

    Program {
        globals: vec![head.clone()],
        initializer: Scope::empty(Statement::Command(Command::Assignment(head, Expression::NullValue))),
        functions: vec![contains],
    }
}

/// A minimal program whose sole operation CASes a heap field directly
/// (`cursor.next`), rather than a plain variable — spec.md §8 boundary
/// scenario 4's literal example, `CAS(<p.next,c,n>)`. Exercises the
/// dereference-destination path of `src/normalize/cas.rs`'s `remove_cas`.
pub fn dereference_cas_program() -> Program {
    let head = VariableDeclaration::new("head", node_type(), true);
    let cursor = VariableDeclaration::new("cursor", node_type(), false);
    let expected = VariableDeclaration::new("expected", node_type(), false);
    let replacement = VariableDeclaration::new("replacement", node_type(), false);
    let ok = VariableDeclaration::new("ok", Type::bool(), false);

    let unlink_next = Function {
        name: "unlink_next".into(),
        kind: FunctionKind::Interface,
        parameters: vec![cursor.clone(), expected.clone(), replacement.clone()],
        returns: vec![ok.clone()],
        body: Scope::new(
            vec![ok.clone()],
            Statement::block(vec![
                Statement::Command(Command::CompareAndSwap {
                    result: ok.clone(),
                    elements: vec![CasElement {
                        dst: Expression::deref(Expression::var(&cursor), "next"),
                        cmp: Expression::var(&expected),
                        src: Expression::var(&replacement),
                    }],
                }),
                Statement::Command(Command::Return(vec![Expression::var(&ok)])),
            ]),
        ),
    };

    Program {
        globals: vec![head.clone()],
        initializer: Scope::empty(Statement::Command(Command::Assignment(head, Expression::NullValue))),
        functions: vec![unlink_next],
    }
}

/// The permissive configuration for [`dereference_cas_program`].
pub fn dereference_cas_config() -> SolverConfig {
    permissive_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treiber_stack_has_one_interface_function() {
        let program = treiber_stack_program();
        let names: Vec<_> = program.interface_functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["push"]);
    }

    #[test]
    fn michael_set_has_one_interface_function() {
        let program = michael_set_program();
        let names: Vec<_> = program.interface_functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["contains"]);
    }

    #[test]
    fn hiding_program_nests_two_same_named_but_distinct_declarations() {
        let program = michael_set_hiding_program();
        let contains = program.function("contains").unwrap();
        match &*contains.body.body {
            Statement::Scope(outer) => match &*outer.body {
                Statement::Scope(inner) => {
                    assert_eq!(outer.variables[0].name, inner.variables[0].name);
                    assert_ne!(outer.variables[0], inner.variables[0]);
                }
                _ => panic!("expected a nested Scope"),
            },
            _ => panic!("expected a Scope"),
        }
    }
}
