//! The post-image engine (spec.md §4.4), grounded on
//! `original_source/src/engine/solver/solver.cpp`: `post` dispatches a
//! command to its per-kind rule after first running every command through
//! `PrepareAccess`.

pub mod access;
pub mod effect;
pub mod fulfillment;
pub mod join;
pub mod post_assign;
pub mod post_assume;
pub mod post_malloc;
pub mod post_read;
pub mod post_write;
pub mod scope;
pub mod widen;

use crate::ast::command::Command;
use crate::config::SolverConfig;
use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::error::VerificationError;
use crate::logic::formula::Annotation;
use crate::logic::symbol::SymbolFactory;

pub use effect::{HeapEffect, PostImage};

/// Computes one command's post-image, gating on `PrepareAccess` first
/// (spec.md §4.4: "every post-image rule assumes its resources are already
/// in scope").
pub fn post<B: SmtBackend>(
    encoder: &mut Encoder<B>,
    config: &SolverConfig,
    factory: &mut SymbolFactory,
    pre: &Annotation,
    cmd: &Command,
) -> Result<PostImage, VerificationError> {
    let mut prepared = pre.clone();
    access::prepare_access(encoder, &mut prepared, &config.flow_value_type, factory, cmd)?;

    match cmd {
        Command::Skip | Command::Break | Command::Continue => Ok(PostImage::single(prepared)),
        Command::Assume(condition) => post_assume::post_assume(encoder, &prepared, condition),
        Command::Assert(condition) => {
            let goal = crate::logic::eval::expr_to_formula(&prepared, condition)?;
            if encoder.entails(&prepared.now, &goal) {
                Ok(PostImage::single(prepared))
            } else {
                Err(VerificationError::Assertion { command: cmd.to_string() })
            }
        }
        Command::Return(_) => Ok(PostImage::single(prepared)),
        Command::Malloc(lhs) => post_malloc::post_malloc(encoder, config, factory, &prepared, lhs),
        Command::Assignment(lhs, rhs) => post_assign::post_assignment(factory, &prepared, lhs, rhs),
        Command::ParallelAssignment(lhs, rhs) => post_assign::post_parallel_assignment(factory, &prepared, lhs, rhs),
        Command::MemoryRead { lhs, base, field } => post_read::post_read(&prepared, lhs, base, field),
        Command::MemoryWrite { base, field, value } => post_write::post_write(&prepared, base, field, value),
        Command::CompareAndSwap { .. } | Command::MacroCall { .. } => {
            Err(VerificationError::UnsupportedConstruct {
                description: format!(
                    "`{cmd}` must be eliminated by normalization before reaching the solver"
                ),
            })
        }
    }
}
