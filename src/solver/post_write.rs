//! `MemoryWrite`'s post-image (spec.md §4.4), grounded on
//! `original_source/src/engine/util/memory.cpp`'s field-update helper and
//! `original_source/src/engine/solver/solver.cpp`'s `HeapEffect`
//! constructor: the targeted resource's field map is updated in place and
//! the before/after pair is recorded as one effect.

use crate::ast::expr::Expression;
use crate::error::{AccessError, VerificationError};
use crate::logic::eval::{eval_expr, find_memory_resource};
use crate::logic::formula::{Annotation, Axiom, Formula, MemoryResource, SymbolicValue};
use crate::solver::effect::{HeapEffect, PostImage};

pub fn post_write(
    pre: &Annotation,
    base: &Expression,
    field: &str,
    value: &Expression,
) -> Result<PostImage, VerificationError> {
    let address = match eval_expr(pre, base)? {
        SymbolicValue::Symbol(s) => s,
        other => {
            return Err(VerificationError::UnsupportedConstruct {
                description: format!("write through a non-symbolic base value `{other}`"),
            })
        }
    };
    let new_value = match eval_expr(pre, value)? {
        SymbolicValue::Symbol(s) => s,
        other => {
            return Err(VerificationError::UnsupportedConstruct {
                description: format!("assignment of non-symbolic value `{other}` to a field"),
            })
        }
    };

    let pre_resource = find_memory_resource(pre, &address)
        .ok_or_else(|| VerificationError::Access {
            command: format!("{base}->{field} := {value}"),
            source: AccessError::MissingMemoryAxiom { variable: address.to_string() },
        })?
        .clone();
    if !pre_resource.fields.contains_key(field) {
        return Err(VerificationError::UnsupportedConstruct {
            description: format!("type has no field `{field}`"),
        });
    }

    let mut post_core = pre_resource.clone();
    post_core.fields.insert(field.to_string(), new_value);

    let is_shared = matches!(find_resource_kind(pre, &address), Some(true));
    let new_resource = if is_shared {
        MemoryResource::Shared(post_core.clone())
    } else {
        MemoryResource::Local(post_core.clone())
    };

    let mut post = pre.clone();
    post.now = replace_memory_axiom(post.now, &address, new_resource);

    Ok(PostImage::single(post).with_effect(HeapEffect::new(pre_resource, post_core)))
}

fn find_resource_kind(annotation: &Annotation, address: &crate::logic::symbol::Symbol) -> Option<bool> {
    crate::logic::util::collect::<MemoryResource>(&annotation.now, |r| r.core().node == *address)
        .first()
        .map(|r| r.is_shared())
}

fn replace_memory_axiom(
    formula: Formula,
    address: &crate::logic::symbol::Symbol,
    replacement: MemoryResource,
) -> Formula {
    match formula {
        Formula::SeparatingConjunction(items) => Formula::SeparatingConjunction(
            items
                .into_iter()
                .map(|f| replace_memory_axiom(f, address, replacement.clone()))
                .collect(),
        ),
        Formula::Axiom(Axiom::Memory(r)) if r.core().node == *address => {
            Formula::Axiom(Axiom::Memory(replacement.clone()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{Sort, Type, VariableDeclaration};
    use crate::logic::formula::{EqualsToAxiom, MemoryAxiom};
    use crate::logic::symbol::SymbolFactory;
    use std::collections::BTreeMap;

    fn node_type() -> Type {
        let mut fields = BTreeMap::new();
        fields.insert("val".to_string(), Type::data());
        Type::with_fields("Node", fields)
    }

    #[test]
    fn write_updates_the_targeted_field_and_records_an_effect() {
        let mut factory = SymbolFactory::new();
        let base_decl = VariableDeclaration::new("n", node_type(), false);
        let addr = factory.fresh_first_order(node_type());
        let old_value = factory.fresh_first_order(Type::data());
        let mut fields = BTreeMap::new();
        fields.insert("val".to_string(), old_value);
        let resource = MemoryResource::Local(MemoryAxiom {
            node: addr.clone(),
            flow: factory.fresh_flow_set(Type::data()),
            fields,
        });
        let rhs_decl = VariableDeclaration::new("v", Type::data(), false);
        let rhs_value = factory.fresh_first_order(Type::data());
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: base_decl.clone(),
            value: addr.clone(),
        }))
        .conjoin(Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: rhs_decl.clone(),
            value: rhs_value.clone(),
        })))
        .conjoin(Formula::Axiom(Axiom::Memory(resource)));
        let pre = Annotation::new(now);
        let image = post_write(&pre, &Expression::var(&base_decl), "val", &Expression::var(&rhs_decl)).unwrap();
        assert_eq!(image.effects.len(), 1);
        let post = &image.successors[0];
        let updated = find_memory_resource(post, &addr).unwrap();
        assert_eq!(updated.fields["val"], rhs_value);
        let _ = Sort::Pointer;
    }
}
