//! Error taxonomy (spec.md §7). Kept as a plain `enum` + hand-written
//! `Display`, matching the teacher's style rather than reaching for a
//! derive-macro error crate.

use std::fmt;

use crate::ast::command::Command;

/// A normalization pass could not preserve semantics.
#[derive(Debug, Clone)]
pub enum TransformationError {
    /// `remove_useless_scopes` found a non-empty-declaration scope it could
    /// not splice away.
    UselessScopeNotRemovable { function: String },
    /// `rename_variables` did not converge within the round budget.
    RenamingDidNotConverge { function: String, rounds: usize },
}

impl fmt::Display for TransformationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformationError::UselessScopeNotRemovable { function } => write!(
                f,
                "function `{function}`: scope declares variables that cannot be spliced away"
            ),
            TransformationError::RenamingDidNotConverge { function, rounds } => write!(
                f,
                "function `{function}`: variable renaming did not converge after {rounds} rounds"
            ),
        }
    }
}

/// A command was rejected by `PrepareAccess` (spec.md §4.4).
#[derive(Debug, Clone)]
pub enum AccessError {
    /// A read/write variable has no `EqualsToAxiom` resource in scope.
    MissingEqualsTo { variable: String },
    /// A dereferenced pointer has no memory axiom after `MakeMemoryAccessible`.
    MissingMemoryAxiom { variable: String },
    /// `PostEnter` would re-declare a name a still-open outer scope holds.
    VariableHiding { variable: String },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::MissingEqualsTo { variable } => {
                write!(f, "variable `{variable}` is read without a known value")
            }
            AccessError::MissingMemoryAxiom { variable } => {
                write!(f, "`{variable}` is dereferenced but no memory axiom is held for it")
            }
            AccessError::VariableHiding { variable } => {
                write!(f, "declaring `{variable}` would hide an outer variable of the same name")
            }
        }
    }
}

/// Top-level error taxonomy raised anywhere between parsing (out of scope,
/// but still a reported kind per spec.md §7) and the solver.
#[derive(Debug, Clone)]
pub enum VerificationError {
    Transformation(TransformationError),
    Access {
        command: String,
        source: AccessError,
    },
    /// `assert(e)` could not be proven.
    Assertion { command: String },
    /// A dereferenced pointer could not be proven non-null.
    UnsafeDereference { command: String },
    /// A newly allocated cell or a post-image annotation fails the
    /// configured invariant.
    InvariantViolation { command: String, invariant: String },
    /// The encoder/solver backend failed or disagreed with itself.
    Encoding { reason: String },
    /// A syntactic form the core does not accept.
    UnsupportedConstruct { description: String },
    /// A property blueprint was instantiated with the wrong arity.
    InvariantArity {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// A property blueprint was instantiated with a non-assignable type.
    InvariantTypeMismatch {
        name: String,
        position: usize,
        expected: String,
        actual: String,
    },
}

impl VerificationError {
    pub fn access(command: &Command, source: AccessError) -> Self {
        VerificationError::Access {
            command: command.to_string(),
            source,
        }
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationError::Transformation(inner) => write!(f, "{inner}"),
            VerificationError::Access { command, source } => {
                write!(f, "at `{command}`: {source}")
            }
            VerificationError::Assertion { command } => {
                write!(f, "assertion could not be proven at `{command}`")
            }
            VerificationError::UnsafeDereference { command } => {
                write!(f, "dereference of a possibly-null pointer at `{command}`")
            }
            VerificationError::InvariantViolation { command, invariant } => write!(
                f,
                "invariant `{invariant}` violated at `{command}`"
            ),
            VerificationError::Encoding { reason } => write!(f, "encoding error: {reason}"),
            VerificationError::UnsupportedConstruct { description } => {
                write!(f, "unsupported construct: {description}")
            }
            VerificationError::InvariantArity { name, expected, actual } => write!(
                f,
                "property `{name}` expects {expected} argument(s), got {actual}"
            ),
            VerificationError::InvariantTypeMismatch {
                name,
                position,
                expected,
                actual,
            } => write!(
                f,
                "property `{name}` argument {position}: expected type `{expected}`, got `{actual}`"
            ),
        }
    }
}

impl std::error::Error for VerificationError {}

impl From<TransformationError> for VerificationError {
    fn from(inner: TransformationError) -> Self {
        VerificationError::Transformation(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_error_mentions_offending_command() {
        let err = VerificationError::access(
            &Command::Skip,
            AccessError::MissingEqualsTo { variable: "x".into() },
        );
        assert!(err.to_string().contains("skip"));
        assert!(err.to_string().contains('x'));
    }
}
