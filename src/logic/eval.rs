//! Symbolic evaluation of program expressions against an [`Annotation`]:
//! "rebind `lhs`'s value to the symbolic evaluation of `rhs` under `now`"
//! (spec.md §4.4), and the companion translation of a pure Boolean
//! expression into a [`Formula`] used by `assume` (§4.4) and by
//! `EncodeInvariants`' blueprint instantiation (§4.3).
//!
//! Grounded on `original_source/src/engine/solver/post_assign.cpp` (value
//! evaluation) and `post_assume.cpp` (condition-to-axiom translation).

use std::sync::Arc;

use crate::ast::expr::Expression;
use crate::ast::types::VariableDeclaration;
use crate::ast::BinaryOperator;
use crate::error::{AccessError, VerificationError};
use crate::logic::formula::{
    Annotation, Axiom, EqualsToAxiom, Formula, MemoryAxiom, MemoryResource, StackAxiom, StackOp,
    SymbolicValue,
};
use crate::logic::symbol::Symbol;
use crate::logic::util::collect;

/// The `EqualsToAxiom` currently bound to `decl`, if any (spec.md I1: at
/// most one per program variable).
pub fn find_equals_to(annotation: &Annotation, decl: &Arc<VariableDeclaration>) -> Option<Symbol> {
    collect::<EqualsToAxiom>(&annotation.now, |a| &a.variable == decl)
        .first()
        .map(|a| a.value.clone())
}

/// Whether some bound variable in scope already has this *name*, regardless
/// of which declaration it is — the clash check `PostEnter` needs (spec.md
/// §8 boundary scenario 6; grounded on `scope.cpp`'s
/// `other->Variable().name == elem->name`). Distinct from [`find_equals_to`],
/// which looks up one specific declaration's current value by identity.
pub fn find_equals_to_by_name(annotation: &Annotation, name: &str) -> bool {
    !collect::<EqualsToAxiom>(&annotation.now, |a| a.variable.name == name).is_empty()
}

/// The memory resource (local or shared) whose node is `address`, if held.
pub fn find_memory_resource<'a>(annotation: &'a Annotation, address: &Symbol) -> Option<&'a MemoryAxiom> {
    collect::<MemoryResource>(&annotation.now, |_| true)
        .into_iter()
        .map(|r| r.core())
        .find(|core| &core.node == address)
}

fn binary_op_to_stack_op(op: BinaryOperator) -> Option<StackOp> {
    match op {
        BinaryOperator::Eq => Some(StackOp::Eq),
        BinaryOperator::Neq => Some(StackOp::Neq),
        BinaryOperator::Leq => Some(StackOp::Leq),
        BinaryOperator::Lt => Some(StackOp::Lt),
        BinaryOperator::Geq => Some(StackOp::Geq),
        BinaryOperator::Gt => Some(StackOp::Gt),
        BinaryOperator::And | BinaryOperator::Or => None,
    }
}

/// Evaluates a non-Boolean-connective expression to the symbol/literal it
/// currently denotes under `annotation.now`. `Binary` comparisons and
/// `And`/`Or` have no value of their own — they only make sense as
/// conditions, translated by [`atomic_stack_axiom`]/[`expr_to_formula`]
/// instead.
pub fn eval_expr(annotation: &Annotation, expr: &Expression) -> Result<SymbolicValue, VerificationError> {
    match expr {
        Expression::BoolValue(b) => Ok(SymbolicValue::Bool(*b)),
        Expression::NullValue => Ok(SymbolicValue::Null),
        Expression::MinValue => Ok(SymbolicValue::Min),
        Expression::MaxValue => Ok(SymbolicValue::Max),
        Expression::Symbolic(sym) => Ok(SymbolicValue::Symbol(sym.clone())),
        Expression::Variable(decl) => find_equals_to(annotation, decl)
            .map(SymbolicValue::Symbol)
            .ok_or_else(|| {
                VerificationError::Access {
                    command: decl.name.clone(),
                    source: AccessError::MissingEqualsTo { variable: decl.name.clone() },
                }
            }),
        Expression::Dereference(base, field) => {
            let base_value = eval_expr(annotation, base)?;
            let address = match base_value {
                SymbolicValue::Symbol(s) => s,
                _ => {
                    return Err(VerificationError::UnsupportedConstruct {
                        description: format!("dereference of a non-symbolic base `{base}`"),
                    })
                }
            };
            let resource = find_memory_resource(annotation, &address).ok_or_else(|| {
                VerificationError::Access {
                    command: expr.to_string(),
                    source: AccessError::MissingMemoryAxiom { variable: address.to_string() },
                }
            })?;
            resource.fields.get(field).cloned().map(SymbolicValue::Symbol).ok_or_else(|| {
                VerificationError::UnsupportedConstruct {
                    description: format!("type has no field `{field}`"),
                }
            })
        }
        Expression::Negated(inner) => match eval_expr(annotation, inner)? {
            SymbolicValue::Bool(b) => Ok(SymbolicValue::Bool(!b)),
            _ => Err(VerificationError::UnsupportedConstruct {
                description: format!("negation of a non-Boolean value `{inner}`"),
            }),
        },
        Expression::Binary(..) => Err(VerificationError::UnsupportedConstruct {
            description: format!("comparison `{expr}` used where a value was expected"),
        }),
    }
}

/// Translates one atomic (non-`And`/`Or`) Boolean expression into a pure
/// [`StackAxiom`]. Composite conditions are handled by `post_assume`, which
/// recurses structurally and only ever calls this on leaves.
pub fn atomic_stack_axiom(annotation: &Annotation, expr: &Expression) -> Result<StackAxiom, VerificationError> {
    match expr {
        Expression::Binary(op, lhs, rhs) => {
            let stack_op = binary_op_to_stack_op(*op).ok_or_else(|| VerificationError::UnsupportedConstruct {
                description: format!("`{op}` is not an atomic comparison"),
            })?;
            Ok(StackAxiom {
                op: stack_op,
                lhs: eval_expr(annotation, lhs)?,
                rhs: eval_expr(annotation, rhs)?,
            })
        }
        Expression::Negated(inner) => match inner.as_ref() {
            Expression::Variable(_) | Expression::Dereference(..) | Expression::Symbolic(_) => Ok(StackAxiom {
                op: StackOp::Eq,
                lhs: eval_expr(annotation, inner)?,
                rhs: SymbolicValue::Bool(false),
            }),
            _ => atomic_stack_axiom(annotation, &crate::ast::expr::negate(inner)),
        },
        Expression::BoolValue(_) | Expression::Variable(_) | Expression::Symbolic(_) => Ok(StackAxiom {
            op: StackOp::Eq,
            lhs: eval_expr(annotation, expr)?,
            rhs: SymbolicValue::Bool(true),
        }),
        _ => Err(VerificationError::UnsupportedConstruct {
            description: format!("`{expr}` is not a Boolean condition"),
        }),
    }
}

/// Translates a purely conjunctive Boolean expression into a [`Formula`].
/// Used for configured-invariant blueprints, which are never expected to
/// branch (spec.md §6: blueprints are "formulas with named free
/// variables"); `assume`'s disjunctive case is handled at the post-image
/// level instead (see `crate::solver::post_assume`), where a nondeterministic
/// `Or` legitimately produces more than one successor annotation.
pub fn expr_to_formula(annotation: &Annotation, expr: &Expression) -> Result<Formula, VerificationError> {
    match expr {
        Expression::Binary(BinaryOperator::And, lhs, rhs) => Ok(expr_to_formula(annotation, lhs)?
            .conjoin(expr_to_formula(annotation, rhs)?)),
        Expression::Binary(BinaryOperator::Or, ..) => Err(VerificationError::UnsupportedConstruct {
            description: "a configured invariant blueprint may not branch on `||`".into(),
        }),
        _ => Ok(Formula::Axiom(Axiom::Stack(atomic_stack_axiom(annotation, expr)?))),
    }
}

/// Builds the scratch annotation a property blueprint is checked against:
/// the resource itself, plus an `EqualsTo` binding a throwaway declaration
/// to the node's address so `Property::instantiate`'s substituted
/// expression (written in terms of ordinary program variables) can be
/// evaluated by `expr_to_formula` the same way any other expression is.
pub fn node_invariant_formula(
    property: &crate::logic::properties::Property,
    resource: &MemoryAxiom,
) -> Result<(Annotation, Formula), VerificationError> {
    if property.arity() != 1 {
        return Err(VerificationError::InvariantArity {
            name: property.name.clone(),
            expected: 1,
            actual: property.arity(),
        });
    }
    let placeholder = VariableDeclaration::new("_node", property.vars[0].ty.clone(), false);
    let instantiated = property.instantiate(std::slice::from_ref(&placeholder))?;
    let now = Formula::Axiom(Axiom::Memory(MemoryResource::Local(resource.clone()))).conjoin(
        Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: placeholder,
            value: resource.node.clone(),
        })),
    );
    let scratch = Annotation::new(now);
    let goal = expr_to_formula(&scratch, &instantiated)?;
    Ok((scratch, goal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;
    use crate::logic::symbol::SymbolFactory;

    #[test]
    fn eval_expr_reads_bound_variable() {
        let mut factory = SymbolFactory::new();
        let decl = VariableDeclaration::new("x", Type::data(), false);
        let value = factory.fresh_first_order(Type::data());
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: decl.clone(),
            value: value.clone(),
        }));
        let annotation = Annotation::new(now);
        let evaluated = eval_expr(&annotation, &Expression::var(&decl)).unwrap();
        assert!(matches!(evaluated, SymbolicValue::Symbol(s) if s == value));
    }

    #[test]
    fn eval_expr_rejects_unbound_variable() {
        let decl = VariableDeclaration::new("x", Type::data(), false);
        let annotation = Annotation::empty();
        assert!(eval_expr(&annotation, &Expression::var(&decl)).is_err());
    }

    #[test]
    fn atomic_stack_axiom_handles_negated_bool_variable() {
        let mut factory = SymbolFactory::new();
        let decl = VariableDeclaration::new("flag", Type::bool(), false);
        let value = factory.fresh_first_order(Type::bool());
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: decl.clone(),
            value: value.clone(),
        }));
        let annotation = Annotation::new(now);
        let negated = Expression::Negated(Box::new(Expression::var(&decl)));
        let axiom = atomic_stack_axiom(&annotation, &negated).unwrap();
        assert_eq!(axiom.op, StackOp::Eq);
        assert!(matches!(axiom.rhs, SymbolicValue::Bool(false)));
    }
}
