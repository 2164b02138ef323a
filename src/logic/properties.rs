//! Invariant/predicate blueprints, grounded on
//! `original_source/src/plankton/properties.hpp`'s `Property<arity, T>`.
//!
//! A blueprint is declared once, over placeholder ("dummy") variable
//! declarations, and instantiated per call site by substituting real
//! declarations for the dummies — this is how `SolverConfig`'s
//! `local_node_invariant`/`shared_node_invariant`/`outflow`/
//! `logically_contains` (spec.md §4.3) are represented before the encoder
//! turns them into SMT terms.

use std::sync::Arc;

use crate::ast::expr::Expression;
use crate::ast::types::VariableDeclaration;
use crate::error::VerificationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyArity {
    One,
    Two,
    OneOrMore,
    Any,
}

impl PropertyArity {
    fn accepts(self, count: usize) -> bool {
        match self {
            PropertyArity::One => count == 1,
            PropertyArity::Two => count == 2,
            PropertyArity::OneOrMore => count >= 1,
            PropertyArity::Any => true,
        }
    }
}

/// A property blueprint: `vars` are placeholder declarations that appear
/// free in `blueprint`; `instantiate` substitutes real declarations for
/// them, checking both the count and per-position assignability.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub vars: Vec<Arc<VariableDeclaration>>,
    pub blueprint: Expression,
}

impl Property {
    pub fn new(
        name: impl Into<String>,
        arity: PropertyArity,
        vars: Vec<Arc<VariableDeclaration>>,
        blueprint: Expression,
    ) -> Result<Self, VerificationError> {
        let name = name.into();
        if !arity.accepts(vars.len()) {
            return Err(VerificationError::InvariantArity {
                name,
                expected: vars.len(),
                actual: vars.len(),
            });
        }
        Ok(Property { name, vars, blueprint })
    }

    pub fn arity(&self) -> usize {
        self.vars.len()
    }

    /// Substitutes `decls` for this blueprint's placeholder variables,
    /// positionally, checking assignability (spec.md §3 `Type::assignable_to`)
    /// at each position — grounded on `Property::instantiate`.
    pub fn instantiate(&self, decls: &[Arc<VariableDeclaration>]) -> Result<Expression, VerificationError> {
        if decls.len() != self.vars.len() {
            return Err(VerificationError::InvariantArity {
                name: self.name.clone(),
                expected: self.vars.len(),
                actual: decls.len(),
            });
        }
        for (index, (dummy, real)) in self.vars.iter().zip(decls).enumerate() {
            if !real.ty.assignable_to(&dummy.ty) {
                return Err(VerificationError::InvariantTypeMismatch {
                    name: self.name.clone(),
                    position: index,
                    expected: dummy.ty.to_string(),
                    actual: real.ty.to_string(),
                });
            }
        }
        Ok(substitute_variables(&self.blueprint, &self.vars, decls))
    }
}

fn substitute_variables(
    expr: &Expression,
    from: &[Arc<VariableDeclaration>],
    to: &[Arc<VariableDeclaration>],
) -> Expression {
    match expr {
        Expression::Variable(decl) => {
            if let Some(index) = from.iter().position(|d| d == decl) {
                Expression::Variable(to[index].clone())
            } else {
                Expression::Variable(decl.clone())
            }
        }
        Expression::Dereference(base, field) => Expression::Dereference(
            Box::new(substitute_variables(base, from, to)),
            field.clone(),
        ),
        Expression::Negated(inner) => {
            Expression::Negated(Box::new(substitute_variables(inner, from, to)))
        }
        Expression::Binary(op, lhs, rhs) => Expression::Binary(
            *op,
            Box::new(substitute_variables(lhs, from, to)),
            Box::new(substitute_variables(rhs, from, to)),
        ),
        other @ (Expression::BoolValue(_)
        | Expression::NullValue
        | Expression::MinValue
        | Expression::MaxValue
        | Expression::Symbolic(_)) => other.clone(),
    }
}

/// A one-variable property: the shared/local node invariant.
pub fn make_invariant(
    name: impl Into<String>,
    node: Arc<VariableDeclaration>,
    blueprint: Expression,
) -> Result<Property, VerificationError> {
    Property::new(name, PropertyArity::One, vec![node], blueprint)
}

/// A two-variable property: `logically_contains(node, key)` and similar.
pub fn make_predicate(
    name: impl Into<String>,
    node: Arc<VariableDeclaration>,
    value: Arc<VariableDeclaration>,
    blueprint: Expression,
) -> Result<Property, VerificationError> {
    Property::new(name, PropertyArity::Two, vec![node, value], blueprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;

    #[test]
    fn instantiate_substitutes_positionally() {
        let dummy = VariableDeclaration::new("n", Type::data(), false);
        let blueprint = Expression::eq(Expression::var(&dummy), Expression::MinValue);
        let invariant = make_invariant("node_inv", dummy, blueprint).unwrap();
        let real = VariableDeclaration::new("head", Type::data(), true);
        let instantiated = invariant.instantiate(&[real.clone()]).unwrap();
        match instantiated {
            Expression::Binary(_, lhs, _) => match *lhs {
                Expression::Variable(decl) => assert_eq!(decl, real),
                _ => panic!("expected a variable"),
            },
            _ => panic!("expected a binary expression"),
        }
    }

    #[test]
    fn instantiate_rejects_wrong_arity() {
        let dummy = VariableDeclaration::new("n", Type::data(), false);
        let invariant = make_invariant("node_inv", dummy, Expression::BoolValue(true)).unwrap();
        let result = invariant.instantiate(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn instantiate_rejects_mismatched_types() {
        let dummy = VariableDeclaration::new("n", Type::data(), false);
        let invariant = make_invariant("node_inv", dummy, Expression::BoolValue(true)).unwrap();
        let real = VariableDeclaration::new("head", Type::bool(), true);
        let result = invariant.instantiate(&[real]);
        assert!(result.is_err());
    }
}
