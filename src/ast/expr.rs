//! Program expressions.

use std::fmt;
use std::sync::Arc;

use crate::ast::types::{Sort, Type, VariableDeclaration};
use crate::logic::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Eq,
    Neq,
    Leq,
    Lt,
    Geq,
    Gt,
    And,
    Or,
}

impl BinaryOperator {
    /// Structural operator flip used by `negate` (grounded on
    /// `cola::negate_binary_operator`): comparisons flip to their logical
    /// complement, `And`/`Or` swap under De Morgan.
    pub fn negate(self) -> BinaryOperator {
        use BinaryOperator::*;
        match self {
            Eq => Neq,
            Neq => Eq,
            Leq => Gt,
            Lt => Geq,
            Geq => Lt,
            Gt => Leq,
            And => Or,
            Or => And,
        }
    }

    pub fn is_boolean_connective(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOperator::*;
        let s = match self {
            Eq => "==",
            Neq => "!=",
            Leq => "<=",
            Lt => "<",
            Geq => ">=",
            Gt => ">",
            And => "&&",
            Or => "||",
        };
        write!(f, "{s}")
    }
}

/// A program-level expression (spec.md §3). `Symbolic` embeds a previously
/// minted logic symbol directly into an expression tree; it only ever
/// appears in annotations built by the solver, never in source-level
/// expressions produced before normalization.
#[derive(Debug, Clone)]
pub enum Expression {
    BoolValue(bool),
    NullValue,
    MinValue,
    MaxValue,
    Variable(Arc<VariableDeclaration>),
    Dereference(Box<Expression>, String),
    Negated(Box<Expression>),
    Binary(BinaryOperator, Box<Expression>, Box<Expression>),
    Symbolic(Symbol),
}

impl Expression {
    pub fn sort(&self) -> Sort {
        match self {
            Expression::BoolValue(_) => Sort::Bool,
            Expression::NullValue => Sort::Pointer,
            Expression::MinValue | Expression::MaxValue => Sort::Data,
            Expression::Variable(decl) => decl.ty.sort,
            Expression::Dereference(_, _) => Sort::Data, // refined by caller via field type
            Expression::Negated(_) => Sort::Bool,
            Expression::Binary(op, ..) => {
                if op.is_boolean_connective() {
                    Sort::Bool
                } else {
                    Sort::Bool
                }
            }
            Expression::Symbolic(sym) => sym.ty().sort,
        }
    }

    /// Whether this is a "simple expression" in the sense `simplify_returns`
    /// needs: a bare literal, variable, or a negation thereof — anything
    /// that does not need to be lifted through an `if`/`choice`.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Expression::BoolValue(_)
                | Expression::NullValue
                | Expression::MinValue
                | Expression::MaxValue
                | Expression::Variable(_)
                | Expression::Symbolic(_)
        ) || matches!(self, Expression::Negated(inner) if inner.is_simple())
    }

    pub fn var(decl: &Arc<VariableDeclaration>) -> Expression {
        Expression::Variable(decl.clone())
    }

    pub fn deref(base: Expression, field: impl Into<String>) -> Expression {
        Expression::Dereference(Box::new(base), field.into())
    }

    pub fn eq(lhs: Expression, rhs: Expression) -> Expression {
        Expression::Binary(BinaryOperator::Eq, Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Expression, rhs: Expression) -> Expression {
        Expression::Binary(BinaryOperator::And, Box::new(lhs), Box::new(rhs))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::BoolValue(b) => write!(f, "{b}"),
            Expression::NullValue => write!(f, "NULL"),
            Expression::MinValue => write!(f, "MIN"),
            Expression::MaxValue => write!(f, "MAX"),
            Expression::Variable(decl) => write!(f, "{}", decl.name),
            Expression::Dereference(base, field) => write!(f, "{base}->{field}"),
            Expression::Negated(inner) => write!(f, "!{inner}"),
            Expression::Binary(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
            Expression::Symbolic(sym) => write!(f, "{sym}"),
        }
    }
}

/// Structural deep copy, grounded on `cola::copy(const Expression&)`
/// (`src/cola/util/cpStmt.cpp` copies commands which in turn copy their
/// expressions; the expression copy itself is the straightforward
/// structural recursion the original labels `cola::copy(const Expression&)`
/// in `negExpr.cpp`).
pub fn copy_expr(expr: &Expression) -> Expression {
    match expr {
        Expression::BoolValue(b) => Expression::BoolValue(*b),
        Expression::NullValue => Expression::NullValue,
        Expression::MinValue => Expression::MinValue,
        Expression::MaxValue => Expression::MaxValue,
        Expression::Variable(decl) => Expression::Variable(decl.clone()),
        Expression::Dereference(base, field) => {
            Expression::Dereference(Box::new(copy_expr(base)), field.clone())
        }
        Expression::Negated(inner) => Expression::Negated(Box::new(copy_expr(inner))),
        Expression::Binary(op, lhs, rhs) => {
            Expression::Binary(*op, Box::new(copy_expr(lhs)), Box::new(copy_expr(rhs)))
        }
        Expression::Symbolic(sym) => Expression::Symbolic(sym.clone()),
    }
}

/// Structural negation (spec.md P6 / §4.1 pass 1), grounded on
/// `src/cola/util/negExpr.cpp`'s `NegateExpressionVisitor`:
/// - `BooleanValue` flips its value.
/// - `NegatedExpression` peels off (double-negation elimination) — the
///   original returns a *copy* of the inner expression, not the same node.
/// - `BinaryExpression` flips the operator; for `And`/`Or` it recurses into
///   both sides (De Morgan), otherwise it just flips the comparison and
///   copies the operands unchanged.
/// - Anything else (bare variable, dereference, literal of non-Bool sort)
///   is wrapped in a `Negated`.
pub fn negate(expr: &Expression) -> Expression {
    match expr {
        Expression::BoolValue(b) => Expression::BoolValue(!b),
        Expression::Negated(inner) => copy_expr(inner),
        Expression::Binary(op, lhs, rhs) => {
            let flipped = op.negate();
            if flipped.is_boolean_connective() {
                Expression::Binary(flipped, Box::new(negate(lhs)), Box::new(negate(rhs)))
            } else {
                Expression::Binary(flipped, Box::new(copy_expr(lhs)), Box::new(copy_expr(rhs)))
            }
        }
        other => Expression::Negated(Box::new(copy_expr(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_round_trips_booleans() {
        let e = Expression::BoolValue(true);
        let nn = negate(&negate(&e));
        assert!(matches!(nn, Expression::BoolValue(true)));
    }

    #[test]
    fn negate_flips_comparison_operators() {
        let decl = VariableDeclaration::new("x", Type::data(), false);
        let e = Expression::eq(Expression::var(&decl), Expression::MinValue);
        let n = negate(&e);
        assert!(matches!(
            n,
            Expression::Binary(BinaryOperator::Neq, ..)
        ));
    }

    #[test]
    fn negate_applies_de_morgan_on_and() {
        let decl = VariableDeclaration::new("b", Type::bool(), false);
        let lhs = Expression::var(&decl);
        let rhs = Expression::BoolValue(true);
        let e = Expression::and(lhs, rhs);
        let n = negate(&e);
        match n {
            Expression::Binary(BinaryOperator::Or, l, r) => {
                assert!(matches!(*l, Expression::Negated(_)));
                assert!(matches!(*r, Expression::BoolValue(false)));
            }
            _ => panic!("expected Or at top level"),
        }
    }

    #[test]
    fn negate_wraps_bare_boolean_variable() {
        let decl = VariableDeclaration::new("flag", Type::bool(), false);
        let e = Expression::var(&decl);
        let n = negate(&e);
        assert!(matches!(n, Expression::Negated(_)));
    }
}
