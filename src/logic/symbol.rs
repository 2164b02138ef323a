//! Logic symbols and the factory that mints them (spec.md §3, §4.2).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ast::types::Type;

/// Whether a symbol stands for an ordinary (first-order) value or for a
/// flow set (second-order): spec.md §3, "Symbols have a type, an order
/// (first-order value or second-order flow set), and stable identity."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    FirstOrder,
    SecondOrder,
}

#[derive(Debug)]
struct SymbolDeclaration {
    id: usize,
    ty: Type,
    order: Order,
}

/// A reference-counted handle to a symbol declaration. Clones are cheap and
/// share identity (spec.md I5: "symbol identity is globally unique within
/// an annotation"); two `Symbol`s compare equal iff they were minted by the
/// same `SymbolFactory::fresh*` call.
#[derive(Debug, Clone)]
pub struct Symbol(Arc<SymbolDeclaration>);

impl Symbol {
    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn order(&self) -> Order {
        self.0.order
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.0.order {
            Order::FirstOrder => "$",
            Order::SecondOrder => "$$",
        };
        write!(f, "{prefix}{}", self.0.id)
    }
}

static NEXT_SYMBOL_ID: AtomicUsize = AtomicUsize::new(0);

/// Mints symbols guaranteed fresh with respect to a set of "avoid" objects
/// (spec.md §3: "A `SymbolFactory` guarantees freshness relative to a set
/// of 'avoid' objects."). Because every symbol carries a globally unique id
/// drawn from a process-wide counter, freshness holds unconditionally; the
/// `avoid` set exists so a factory can be seeded from an existing
/// annotation/frame and report which ids are already taken, matching
/// `SymbolFactory(frame)` in `original_source/src/engine/solver/post_malloc.cpp`.
pub struct SymbolFactory {
    avoid_max_id: usize,
}

impl SymbolFactory {
    pub fn new() -> Self {
        SymbolFactory { avoid_max_id: 0 }
    }

    /// Seeds a factory from an existing set of symbols, so subsequently
    /// minted symbols are guaranteed not to collide with any of them (they
    /// never could anyway, given the global counter, but this mirrors the
    /// original's `SymbolFactory(frame)` constructor and is the hook future
    /// callers use to assert "these ids were already present").
    pub fn seeded_from<'a>(existing: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let avoid_max_id = existing.into_iter().map(Symbol::id).max().unwrap_or(0);
        SymbolFactory { avoid_max_id }
    }

    pub fn fresh_first_order(&mut self, ty: Type) -> Symbol {
        self.mint(ty, Order::FirstOrder)
    }

    pub fn fresh_flow_set(&mut self, ty: Type) -> Symbol {
        self.mint(ty, Order::SecondOrder)
    }

    fn mint(&mut self, ty: Type, order: Order) -> Symbol {
        let id = NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed);
        debug_assert!(id >= self.avoid_max_id || self.avoid_max_id == 0);
        Symbol(Arc::new(SymbolDeclaration { id, ty, order }))
    }
}

impl Default for SymbolFactory {
    fn default() -> Self {
        SymbolFactory::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_symbols_are_distinct() {
        let mut factory = SymbolFactory::new();
        let a = factory.fresh_first_order(Type::data());
        let b = factory.fresh_first_order(Type::data());
        assert_ne!(a, b);
    }

    #[test]
    fn clones_share_identity() {
        let mut factory = SymbolFactory::new();
        let a = factory.fresh_first_order(Type::data());
        let a2 = a.clone();
        assert_eq!(a, a2);
    }

    #[test]
    fn flow_set_symbols_are_second_order() {
        let mut factory = SymbolFactory::new();
        let flow = factory.fresh_flow_set(Type::data());
        assert_eq!(flow.order(), Order::SecondOrder);
    }
}
