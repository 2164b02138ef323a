//! `MakeDefaultRenaming`/`MakeMemoryRenaming` (spec.md §4.2).

use std::collections::HashMap;

use crate::logic::formula::{Formula, MemoryAxiom};
use crate::logic::symbol::{Order, Symbol, SymbolFactory};
use crate::logic::util::substitute_symbols;

/// A renaming that, applied to a symbol it has not yet seen, mints a fresh
/// symbol of the same type and order and remembers the mapping — so a
/// second application to the same input returns the same output. This is
/// what lets two annotations be conjoined while keeping symbol identity
/// disjoint (spec.md I5).
pub struct DefaultRenaming<'a> {
    factory: &'a mut SymbolFactory,
    memo: HashMap<usize, Symbol>,
}

impl<'a> DefaultRenaming<'a> {
    pub fn new(factory: &'a mut SymbolFactory) -> Self {
        DefaultRenaming {
            factory,
            memo: HashMap::new(),
        }
    }

    pub fn apply(&mut self, symbol: &Symbol) -> Symbol {
        if let Some(existing) = self.memo.get(&symbol.id()) {
            return existing.clone();
        }
        let fresh = match symbol.order() {
            Order::FirstOrder => self.factory.fresh_first_order(symbol.ty().clone()),
            Order::SecondOrder => self.factory.fresh_flow_set(symbol.ty().clone()),
        };
        self.memo.insert(symbol.id(), fresh.clone());
        fresh
    }

    pub fn apply_formula(&mut self, formula: &Formula) -> Formula {
        substitute_symbols(formula, &mut |s| self.apply(s))
    }
}

/// A renaming fixed in advance, mapping exactly the symbols of one memory
/// axiom to the corresponding symbols of another and acting as identity
/// elsewhere (spec.md §4.2: `MakeMemoryRenaming(A,B)`).
pub struct StaticRenaming(HashMap<usize, Symbol>);

impl StaticRenaming {
    pub fn apply(&self, symbol: &Symbol) -> Symbol {
        self.0.get(&symbol.id()).cloned().unwrap_or_else(|| symbol.clone())
    }

    pub fn apply_formula(&self, formula: &Formula) -> Formula {
        substitute_symbols(formula, &mut |s| self.apply(s))
    }
}

pub fn make_memory_renaming(a: &MemoryAxiom, b: &MemoryAxiom) -> StaticRenaming {
    let mut map = HashMap::new();
    map.insert(a.node.id(), b.node.clone());
    map.insert(a.flow.id(), b.flow.clone());
    for (field, sym) in &a.fields {
        if let Some(other) = b.fields.get(field) {
            map.insert(sym.id(), other.clone());
        }
    }
    StaticRenaming(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;
    use crate::logic::formula::{Axiom, StackAxiom, StackOp, SymbolicValue};
    use crate::logic::util::syntactically_contains;

    #[test]
    fn default_renaming_memoizes_per_input() {
        let mut factory = SymbolFactory::new();
        let s = factory.fresh_first_order(Type::data());
        let mut renaming = DefaultRenaming::new(&mut factory);
        let a = renaming.apply(&s);
        let b = renaming.apply(&s);
        assert_eq!(a, b);
        assert_ne!(a, s);
    }

    #[test]
    fn default_renaming_applies_to_a_formula() {
        let mut factory = SymbolFactory::new();
        let s = factory.fresh_first_order(Type::data());
        let formula = Formula::Axiom(Axiom::Stack(StackAxiom {
            op: StackOp::Eq,
            lhs: SymbolicValue::Symbol(s.clone()),
            rhs: SymbolicValue::Null,
        }));
        let mut renaming = DefaultRenaming::new(&mut factory);
        let renamed = renaming.apply_formula(&formula);
        assert!(!syntactically_contains(&renamed, &s).found);
    }

    #[test]
    fn memory_renaming_maps_matching_fields_only() {
        let mut factory = SymbolFactory::new();
        let mut fields_a = std::collections::BTreeMap::new();
        fields_a.insert("next".to_string(), factory.fresh_first_order(Type::data()));
        let a = MemoryAxiom {
            node: factory.fresh_first_order(Type::data()),
            flow: factory.fresh_flow_set(Type::data()),
            fields: fields_a.clone(),
        };
        let mut fields_b = std::collections::BTreeMap::new();
        fields_b.insert("next".to_string(), factory.fresh_first_order(Type::data()));
        let b = MemoryAxiom {
            node: factory.fresh_first_order(Type::data()),
            flow: factory.fresh_flow_set(Type::data()),
            fields: fields_b.clone(),
        };
        let renaming = make_memory_renaming(&a, &b);
        assert_eq!(renaming.apply(&a.node), b.node);
        assert_eq!(renaming.apply(&fields_a["next"]), fields_b["next"]);
    }
}
