//! `Malloc`'s post-image (spec.md §4.4), grounded on
//! `original_source/src/engine/solver/post_malloc.cpp`: build a fresh cell
//! via `MakeFreshCell` (`crate::logic::constructors::make_fresh_cell`, which
//! already carries the freshness axioms), rebind the target variable, and
//! reject the result if it fails the configured local-node invariant.

use std::sync::Arc;

use crate::ast::types::VariableDeclaration;
use crate::config::SolverConfig;
use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::error::VerificationError;
use crate::logic::constructors::make_fresh_cell;
use crate::logic::formula::{Annotation, Axiom, EqualsToAxiom, Formula, MemoryResource};
use crate::logic::symbol::{Order, SymbolFactory};
use crate::logic::util::collect;
use crate::solver::effect::PostImage;
use crate::solver::scope::rebind;

pub fn post_malloc<B: SmtBackend>(
    encoder: &mut Encoder<B>,
    config: &SolverConfig,
    factory: &mut SymbolFactory,
    pre: &Annotation,
    lhs: &Arc<VariableDeclaration>,
) -> Result<PostImage, VerificationError> {
    let in_scope: Vec<_> = collect::<EqualsToAxiom>(&pre.now, |_| true)
        .into_iter()
        .map(|a| a.value.clone())
        .filter(|s| s.order() == Order::FirstOrder)
        .collect();

    let (resource, freshness) = make_fresh_cell(lhs.ty.clone(), config.flow_value_type.clone(), factory, &in_scope);

    if !encoder.check_node_invariant(config, &resource)? {
        return Err(VerificationError::InvariantViolation {
            command: format!("{} = malloc", lhs.name),
            invariant: config.local_node_invariant.name.clone(),
        });
    }

    let mut post = pre.clone();
    post.now = rebind(post.now, lhs, resource.core().node.clone())
        .conjoin(Formula::Axiom(Axiom::Memory(MemoryResource::Local(resource.core().clone()))))
        .conjoin(freshness);

    Ok(PostImage::single(post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{Sort, Type};
    use crate::encoder::z3_backend::Z3Backend;
    use crate::logic::properties::make_invariant;
    use std::collections::BTreeMap;

    fn node_type() -> Type {
        let mut fields = BTreeMap::new();
        fields.insert("next".to_string(), Type::new("Node", Sort::Pointer));
        Type::with_fields("Node", fields)
    }

    fn trivial_config() -> SolverConfig {
        let node = VariableDeclaration::new("n", node_type(), false);
        let invariant = make_invariant("trivially_true", node, crate::ast::expr::Expression::BoolValue(true)).unwrap();
        SolverConfig {
            flow_value_type: Type::data(),
            local_node_invariant: invariant.clone(),
            shared_node_invariant: invariant.clone(),
            outflow: vec![],
            logically_contains: invariant,
        }
    }

    #[test]
    fn malloc_binds_lhs_to_a_fresh_local_resource() {
        let mut factory = SymbolFactory::new();
        let mut encoder = Encoder::new(Z3Backend::new());
        let config = trivial_config();
        let lhs = VariableDeclaration::new("n", node_type(), false);
        let pre = Annotation::empty();
        let image = post_malloc(&mut encoder, &config, &mut factory, &pre, &lhs).unwrap();
        assert_eq!(image.successors.len(), 1);
        let post = &image.successors[0];
        let bound = collect::<EqualsToAxiom>(&post.now, |a| a.variable == lhs);
        assert_eq!(bound.len(), 1);
        assert!(collect::<MemoryResource>(&post.now, |_| true).len() == 1);
    }
}
