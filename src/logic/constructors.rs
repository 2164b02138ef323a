//! `MakeSharedMemory`/`MakeLocalMemory` (spec.md §4.2) and the `MakeFreshCell`
//! supplement grounded on
//! `original_source/src/engine/solver/post_malloc.cpp`.

use crate::ast::types::{Sort, Type};
use crate::logic::formula::{
    Axiom, Formula, InflowEmptinessAxiom, MemoryAxiom, MemoryResource, StackAxiom, StackOp,
    SymbolicValue,
};
use crate::logic::symbol::{Order, Symbol, SymbolFactory};

fn make_memory_axiom(addr: Symbol, flow_type: Type, factory: &mut SymbolFactory) -> MemoryAxiom {
    let flow = factory.fresh_flow_set(flow_type);
    let fields = addr
        .ty()
        .fields()
        .map(|(name, field_ty)| (name.to_string(), factory.fresh_first_order(field_ty.clone())))
        .collect();
    MemoryAxiom { node: addr, flow, fields }
}

/// Produces a fresh `SharedMemoryCore` for `addr` (spec.md §4.2: "produce
/// fresh symbols for every field of `addr.type`").
pub fn make_shared_memory(addr: Symbol, flow_type: Type, factory: &mut SymbolFactory) -> MemoryResource {
    MemoryResource::Shared(make_memory_axiom(addr, flow_type, factory))
}

/// Produces a fresh `LocalMemoryResource` for `addr`.
pub fn make_local_memory(addr: Symbol, flow_type: Type, factory: &mut SymbolFactory) -> MemoryResource {
    MemoryResource::Local(make_memory_axiom(addr, flow_type, factory))
}

/// Builds a brand-new heap cell for `Malloc`'s post-image: a fresh address
/// symbol, its `LocalMemoryResource`, and the axioms that pin down freshness
/// — non-null address, empty inflow, null-initialized pointer fields, and
/// pairwise disequality against every other already-live symbol of the same
/// type (grounded on `post_malloc.cpp`'s `MakeFreshCell`).
pub fn make_fresh_cell(
    addr_type: Type,
    flow_type: Type,
    factory: &mut SymbolFactory,
    in_scope: &[Symbol],
) -> (MemoryResource, Formula) {
    let addr = factory.fresh_first_order(addr_type.clone());
    let resource = make_local_memory(addr.clone(), flow_type, factory);
    let core = resource.core();

    let mut conjuncts = vec![
        Formula::Axiom(Axiom::Stack(StackAxiom {
            op: StackOp::Neq,
            lhs: SymbolicValue::Symbol(addr.clone()),
            rhs: SymbolicValue::Null,
        })),
        Formula::Axiom(Axiom::InflowEmptiness(InflowEmptinessAxiom {
            flow: core.flow.clone(),
            is_empty: true,
        })),
    ];

    for field_sym in core.fields.values() {
        if field_sym.ty().sort == Sort::Pointer {
            conjuncts.push(Formula::Axiom(Axiom::Stack(StackAxiom {
                op: StackOp::Eq,
                lhs: SymbolicValue::Symbol(field_sym.clone()),
                rhs: SymbolicValue::Null,
            })));
        }
    }

    for other in in_scope {
        if other.order() == Order::FirstOrder && other.ty() == &addr_type && other != &addr {
            conjuncts.push(Formula::Axiom(Axiom::Stack(StackAxiom {
                op: StackOp::Neq,
                lhs: SymbolicValue::Symbol(addr.clone()),
                rhs: SymbolicValue::Symbol(other.clone()),
            })));
        }
    }

    (resource, Formula::SeparatingConjunction(conjuncts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_type() -> Type {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("next".to_string(), Type::new("Node", Sort::Pointer));
        fields.insert("val".to_string(), Type::data());
        Type::with_fields("Node", fields)
    }

    #[test]
    fn fresh_cell_initializes_pointer_fields_to_null() {
        let mut factory = SymbolFactory::new();
        let (resource, axioms) = make_fresh_cell(node_type(), Type::data(), &mut factory, &[]);
        assert!(!resource.is_shared());
        assert_eq!(axioms.conjuncts().len(), 3); // non-null, empty-inflow, next==null
    }

    #[test]
    fn fresh_cell_is_disequal_to_existing_same_type_symbols() {
        let mut factory = SymbolFactory::new();
        let existing = factory.fresh_first_order(node_type());
        let (_, axioms) = make_fresh_cell(node_type(), Type::data(), &mut factory, &[existing]);
        assert_eq!(axioms.conjuncts().len(), 4); // + freshness disequality
    }
}
