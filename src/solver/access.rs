//! `PrepareAccess` (spec.md §4.4), grounded 1:1 on
//! `original_source/src/engine/solver/access.cpp`: every command's
//! post-image first runs through this to guarantee the resources it touches
//! are in scope before the per-command rule fires.

use crate::ast::command::{dereferenced_variables, referenced_variables, Command};
use crate::ast::types::Sort;
use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::error::{AccessError, VerificationError};
use crate::logic::constructors::make_shared_memory;
use crate::logic::eval::{find_equals_to, find_memory_resource};
use crate::logic::formula::{Annotation, Axiom, Formula, SymbolicValue};
use crate::logic::symbol::SymbolFactory;

/// Enlarges `annotation`'s footprint so `cmd` can run, mutating it in place:
/// every variable `cmd` reads or writes must already have an `EqualsToAxiom`
/// (`PointerCollector`-equivalent check); every pointer `cmd` dereferences
/// that is not already backed by a memory resource is first checked against
/// the encoder — a provably-null pointer is rejected outright (spec.md
/// §4.4(b)) rather than handed a resource it can never legitimately hold —
/// and otherwise gets one materialized via `MakeMemoryAccessible`
/// (`DereferenceCollector`-equivalent), then the dereference targets are
/// re-checked.
pub fn prepare_access<B: SmtBackend>(
    encoder: &mut Encoder<B>,
    annotation: &mut Annotation,
    flow_value_type: &crate::ast::types::Type,
    factory: &mut SymbolFactory,
    cmd: &Command,
) -> Result<(), VerificationError> {
    for var in referenced_variables(cmd) {
        if find_equals_to(annotation, &var).is_none() {
            return Err(VerificationError::access(
                cmd,
                AccessError::MissingEqualsTo { variable: var.name.clone() },
            ));
        }
    }

    for var in dereferenced_variables(cmd) {
        let address = find_equals_to(annotation, &var).ok_or_else(|| {
            VerificationError::access(cmd, AccessError::MissingEqualsTo { variable: var.name.clone() })
        })?;
        if address.ty().sort != Sort::Pointer {
            continue;
        }
        if find_memory_resource(annotation, &address).is_some() {
            continue;
        }
        if encoder.entails_is_null(&annotation.now, &SymbolicValue::Symbol(address.clone())) {
            return Err(VerificationError::UnsafeDereference { command: cmd.to_string() });
        }
        let resource = make_shared_memory(address, flow_value_type.clone(), factory);
        annotation.now = std::mem::replace(&mut annotation.now, Formula::empty_conjunction())
            .conjoin(Formula::Axiom(Axiom::Memory(resource)));
    }

    for var in dereferenced_variables(cmd) {
        let address = find_equals_to(annotation, &var).expect("checked above");
        if address.ty().sort == Sort::Pointer && find_memory_resource(annotation, &address).is_none() {
            return Err(VerificationError::access(
                cmd,
                AccessError::MissingMemoryAxiom { variable: var.name.clone() },
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::Expression;
    use crate::ast::types::{Type, VariableDeclaration};
    use crate::encoder::z3_backend::Z3Backend;
    use crate::logic::formula::{Axiom, EqualsToAxiom};
    use std::collections::BTreeMap;

    fn node_type() -> Type {
        let mut fields = BTreeMap::new();
        fields.insert("next".to_string(), Type::new("Node", Sort::Pointer));
        Type::with_fields("Node", fields)
    }

    #[test]
    fn rejects_read_of_unbound_variable() {
        let decl = VariableDeclaration::new("x", Type::data(), false);
        let mut annotation = Annotation::empty();
        let mut factory = SymbolFactory::new();
        let mut encoder = Encoder::new(Z3Backend::new());
        let cmd = Command::Assert(Expression::var(&decl));
        let result = prepare_access(&mut encoder, &mut annotation, &Type::data(), &mut factory, &cmd);
        assert!(result.is_err());
    }

    #[test]
    fn materializes_shared_memory_for_a_dereferenced_pointer() {
        let mut factory = SymbolFactory::new();
        let mut encoder = Encoder::new(Z3Backend::new());
        let decl = VariableDeclaration::new("n", node_type(), false);
        let addr = factory.fresh_first_order(node_type());
        let y = VariableDeclaration::new("y", Type::data(), false);
        let y_value = factory.fresh_first_order(Type::data());
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: decl.clone(),
            value: addr.clone(),
        }))
        .conjoin(Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: y.clone(),
            value: y_value,
        })));
        let mut annotation = Annotation::new(now);
        let cmd = Command::MemoryRead {
            lhs: vec![y],
            base: vec![Expression::var(&decl)],
            field: vec!["next".to_string()],
        };
        prepare_access(&mut encoder, &mut annotation, &Type::data(), &mut factory, &cmd).unwrap();
        assert!(find_memory_resource(&annotation, &addr).is_some());
    }

    /// spec.md §4.4(b): a pointer the encoder can already prove null must be
    /// rejected before a shared-memory resource is ever materialized for it.
    #[test]
    fn rejects_dereference_of_a_provably_null_pointer() {
        use crate::logic::formula::{StackAxiom, StackOp};

        let mut factory = SymbolFactory::new();
        let mut encoder = Encoder::new(Z3Backend::new());
        let decl = VariableDeclaration::new("n", node_type(), false);
        let addr = factory.fresh_first_order(node_type());
        let y = VariableDeclaration::new("y", Type::data(), false);
        let y_value = factory.fresh_first_order(Type::data());
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: decl.clone(),
            value: addr.clone(),
        }))
        .conjoin(Formula::Axiom(Axiom::Stack(StackAxiom {
            op: StackOp::Eq,
            lhs: SymbolicValue::Symbol(addr),
            rhs: SymbolicValue::Null,
        })))
        .conjoin(Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: y.clone(),
            value: y_value,
        })));
        let mut annotation = Annotation::new(now);
        let cmd = Command::MemoryRead {
            lhs: vec![y],
            base: vec![Expression::var(&decl)],
            field: vec!["next".to_string()],
        };
        let result = prepare_access(&mut encoder, &mut annotation, &Type::data(), &mut factory, &cmd);
        assert!(matches!(result, Err(VerificationError::UnsafeDereference { .. })));
    }
}
