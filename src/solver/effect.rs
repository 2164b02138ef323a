//! `PostImage`/`HeapEffect` (spec.md §4.4), grounded on
//! `original_source/src/engine/solver/solver.cpp`'s constructors.

use crate::logic::formula::{Annotation, Axiom, Formula, MemoryAxiom, MemoryResource};
use crate::logic::symbol::{Symbol, SymbolFactory};
use crate::logic::util::collect;

/// Records one heap mutation a post-image step performed: the node's state
/// immediately before and immediately after, sharing one address symbol
/// (the original's constructor asserts this; we uphold it by only ever
/// building a `HeapEffect` from a `pre`/`post` pair taken from the same
/// resource before and after a field update).
#[derive(Debug, Clone)]
pub struct HeapEffect {
    pub pre: MemoryAxiom,
    pub post: MemoryAxiom,
}

impl HeapEffect {
    pub fn new(pre: MemoryAxiom, post: MemoryAxiom) -> Self {
        debug_assert_eq!(pre.node, post.node, "a HeapEffect's pre/post must share one node address");
        HeapEffect { pre, post }
    }
}

/// The result of computing one command's post-image: the annotation(s) it
/// produces (more than one for a nondeterministic `assume`/`choice` branch
/// split, spec.md §4.5 "choice unions them"), plus the heap effects
/// performed along the way. An empty `successors` vector means the command
/// is infeasible from this pre-state (e.g. `assume` of a condition that
/// contradicts `now`, spec.md P4) — not an error, just no successor.
#[derive(Debug, Clone, Default)]
pub struct PostImage {
    pub successors: Vec<Annotation>,
    pub effects: Vec<HeapEffect>,
}

impl PostImage {
    pub fn single(annotation: Annotation) -> Self {
        PostImage {
            successors: vec![annotation],
            effects: Vec::new(),
        }
    }

    pub fn infeasible() -> Self {
        PostImage::default()
    }

    pub fn with_effect(mut self, effect: HeapEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_infeasible(&self) -> bool {
        self.successors.is_empty()
    }
}

/// Applies one heap effect as interference to `annotation` (spec.md §5:
/// "shared-memory resources whose updates produce heap effects that are
/// later applied as interference to all function annotations"). If
/// `annotation` holds a shared resource for `effect`'s node, any field the
/// effect changed is rebound to a fresh, unconstrained symbol — this thread
/// can no longer assume the field still holds what it last read there,
/// since some other thread's step may have landed in between. A no-op if no
/// shared resource for that node is currently held, or the effect changed
/// nothing this thread could observe.
pub fn apply_effect(annotation: &Annotation, factory: &mut SymbolFactory, effect: &HeapEffect) -> Annotation {
    let held = collect::<MemoryResource>(&annotation.now, |r| r.is_shared() && r.core().node == effect.pre.node);
    let Some(resource) = held.first() else {
        return annotation.clone();
    };

    let mut updated = resource.core().clone();
    let mut changed = false;
    for (field, new_value) in &effect.post.fields {
        if updated.fields.get(field) != Some(new_value) {
            updated.fields.insert(field.clone(), factory.fresh_first_order(new_value.ty().clone()));
            changed = true;
        }
    }
    if !changed {
        return annotation.clone();
    }

    let mut post = annotation.clone();
    post.now = replace_shared_resource(post.now, &effect.pre.node, MemoryResource::Shared(updated));
    post
}

/// Folds every known effect into `annotation` in turn (order does not
/// matter: each effect only ever touches the one resource its own `pre.node`
/// names).
pub fn apply_effects(annotation: &Annotation, factory: &mut SymbolFactory, effects: &[HeapEffect]) -> Annotation {
    effects.iter().fold(annotation.clone(), |acc, effect| apply_effect(&acc, factory, effect))
}

fn replace_shared_resource(formula: Formula, node: &Symbol, replacement: MemoryResource) -> Formula {
    match formula {
        Formula::SeparatingConjunction(items) => Formula::SeparatingConjunction(
            items
                .into_iter()
                .map(|f| replace_shared_resource(f, node, replacement.clone()))
                .collect(),
        ),
        Formula::Axiom(Axiom::Memory(r)) if r.core().node == *node => {
            Formula::Axiom(Axiom::Memory(replacement.clone()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::formula::Formula;

    #[test]
    fn infeasible_post_image_has_no_successors() {
        assert!(PostImage::infeasible().is_infeasible());
    }

    #[test]
    fn single_post_image_carries_one_successor() {
        let image = PostImage::single(Annotation::new(Formula::empty_conjunction()));
        assert_eq!(image.successors.len(), 1);
        assert!(!image.is_infeasible());
    }

    #[test]
    fn apply_effect_forgets_a_field_another_thread_changed() {
        use std::collections::BTreeMap;

        let mut factory = SymbolFactory::new();
        let node_ty = crate::ast::types::Type::new("Node", crate::ast::types::Sort::Pointer);
        let addr = factory.fresh_first_order(node_ty.clone());
        let flow = factory.fresh_flow_set(crate::ast::types::Type::data());
        let old_value = factory.fresh_first_order(crate::ast::types::Type::data());
        let new_value = factory.fresh_first_order(crate::ast::types::Type::data());

        let mut pre_fields = BTreeMap::new();
        pre_fields.insert("val".to_string(), old_value.clone());
        let pre_core = MemoryAxiom { node: addr.clone(), flow: flow.clone(), fields: pre_fields.clone() };
        let mut post_fields = pre_fields.clone();
        post_fields.insert("val".to_string(), new_value);
        let post_core = MemoryAxiom { node: addr.clone(), flow, fields: post_fields };
        let effect = HeapEffect::new(pre_core.clone(), post_core);

        let annotation = Annotation::new(Formula::Axiom(Axiom::Memory(MemoryResource::Shared(pre_core))));
        let interfered = apply_effect(&annotation, &mut factory, &effect);

        let resource = collect::<MemoryResource>(&interfered.now, |_| true);
        assert_eq!(resource.len(), 1);
        assert_ne!(resource[0].core().fields["val"], old_value);
    }

    #[test]
    fn apply_effect_is_a_no_op_without_a_matching_shared_resource() {
        let mut factory = SymbolFactory::new();
        let node_ty = crate::ast::types::Type::new("Node", crate::ast::types::Sort::Pointer);
        let addr = factory.fresh_first_order(node_ty.clone());
        let other_addr = factory.fresh_first_order(node_ty);
        let flow = factory.fresh_flow_set(crate::ast::types::Type::data());
        let value = factory.fresh_first_order(crate::ast::types::Type::data());
        let other_value = factory.fresh_first_order(crate::ast::types::Type::data());

        let pre_core = MemoryAxiom { node: other_addr, flow: flow.clone(), fields: std::collections::BTreeMap::new() };
        let mut post_fields = std::collections::BTreeMap::new();
        post_fields.insert("val".to_string(), other_value);
        let post_core = MemoryAxiom { node: pre_core.node.clone(), flow, fields: post_fields };
        let effect = HeapEffect::new(pre_core, post_core);

        let mut fields = std::collections::BTreeMap::new();
        fields.insert("val".to_string(), value);
        let held = MemoryAxiom { node: addr, flow: factory.fresh_flow_set(crate::ast::types::Type::data()), fields };
        let annotation = Annotation::new(Formula::Axiom(Axiom::Memory(MemoryResource::Shared(held))));
        let unchanged = apply_effect(&annotation, &mut factory, &effect);
        assert_eq!(unchanged.now.to_string(), annotation.now.to_string());
    }
}
