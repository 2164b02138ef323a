//! `MemoryRead`'s post-image (spec.md §4.4), grounded on
//! `original_source/src/engine/solver/post_assign_read.cpp`: every base
//! expression and field lookup is evaluated against the *pre*-state `now`
//! before any `lhs` is rebound (simultaneous semantics — spec.md §9 Open
//! Question, resolved in SPEC_FULL.md §4.4: the original loops over indices
//! only reading `pre->now` and only writing results at the end of each
//! iteration, never re-reading a just-written `lhs` in a later expression).

use std::sync::Arc;

use crate::ast::expr::Expression;
use crate::ast::types::VariableDeclaration;
use crate::error::{AccessError, VerificationError};
use crate::logic::eval::{eval_expr, find_memory_resource};
use crate::logic::formula::{Annotation, Axiom, EqualsToAxiom, Formula, SymbolicValue};
use crate::solver::effect::PostImage;

pub fn post_read(
    pre: &Annotation,
    lhs: &[Arc<VariableDeclaration>],
    base: &[Expression],
    field: &[String],
) -> Result<PostImage, VerificationError> {
    let mut read_values = Vec::with_capacity(lhs.len());
    for (base_expr, field_name) in base.iter().zip(field) {
        let address = match eval_expr(pre, base_expr)? {
            SymbolicValue::Symbol(s) => s,
            other => {
                return Err(VerificationError::UnsupportedConstruct {
                    description: format!("dereference of a non-symbolic base value `{other}`"),
                })
            }
        };
        let resource = find_memory_resource(pre, &address).ok_or_else(|| {
            VerificationError::Access {
                command: format!("{base_expr}->{field_name}"),
                source: AccessError::MissingMemoryAxiom { variable: address.to_string() },
            }
        })?;
        let value = resource.fields.get(field_name).cloned().ok_or_else(|| {
            VerificationError::UnsupportedConstruct {
                description: format!("type has no field `{field_name}`"),
            }
        })?;
        read_values.push(value);
    }

    let mut post = pre.clone();
    for (decl, value) in lhs.iter().zip(read_values) {
        post.now = crate::solver::scope::rebind(post.now, decl, value);
    }
    Ok(PostImage::single(post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{Sort, Type};
    use crate::logic::formula::{Axiom, MemoryAxiom, MemoryResource};
    use crate::logic::symbol::SymbolFactory;
    use std::collections::BTreeMap;

    fn node_type() -> Type {
        let mut fields = BTreeMap::new();
        fields.insert("val".to_string(), Type::data());
        Type::with_fields("Node", fields)
    }

    #[test]
    fn read_rebinds_lhs_to_the_pre_state_field_value() {
        let mut factory = SymbolFactory::new();
        let base_decl = VariableDeclaration::new("n", node_type(), false);
        let addr = factory.fresh_first_order(node_type());
        let field_value = factory.fresh_first_order(Type::data());
        let mut fields = BTreeMap::new();
        fields.insert("val".to_string(), field_value.clone());
        let resource = MemoryResource::Local(MemoryAxiom {
            node: addr.clone(),
            flow: factory.fresh_flow_set(Type::data()),
            fields,
        });
        let lhs = VariableDeclaration::new("x", Type::data(), false);
        let now = Formula::Axiom(Axiom::EqualsTo(EqualsToAxiom {
            variable: base_decl.clone(),
            value: addr,
        }))
        .conjoin(Formula::Axiom(Axiom::Memory(resource)));
        let pre = Annotation::new(now);
        let image = post_read(&pre, &[lhs.clone()], &[Expression::var(&base_decl)], &["val".to_string()]).unwrap();
        let post = &image.successors[0];
        let bound = crate::logic::eval::find_equals_to(post, &lhs).unwrap();
        assert_eq!(bound, field_value);
        let _ = Sort::Pointer;
    }
}
