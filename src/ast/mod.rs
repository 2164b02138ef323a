//! The surface/core program language shared by the normalizer and solver.

pub mod command;
pub mod expr;
pub mod stmt;
pub mod types;
pub mod visit;

pub use command::{Command, CasElement};
pub use expr::{BinaryOperator, Expression};
pub use stmt::{Function, FunctionKind, Program, Scope, Statement};
pub use types::{Sort, Type, VariableDeclaration};
