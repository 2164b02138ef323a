//! Types and variable declarations of the surface/core program language.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The sort of a [`Type`]; determines which SMT theory a value of this type
/// is encoded into (see `crate::encoder`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Data,
    Pointer,
    Void,
}

/// A named type. Pointer types carry a field table mapping field name to the
/// type of the referent stored there (`cola::Type` in the original system).
#[derive(Debug, Clone)]
pub struct Type {
    pub name: Arc<str>,
    pub sort: Sort,
    fields: Arc<BTreeMap<String, Type>>,
}

impl Type {
    pub fn new(name: impl Into<Arc<str>>, sort: Sort) -> Self {
        Type {
            name: name.into(),
            sort,
            fields: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_fields(name: impl Into<Arc<str>>, fields: BTreeMap<String, Type>) -> Self {
        Type {
            name: name.into(),
            sort: Sort::Pointer,
            fields: Arc::new(fields),
        }
    }

    pub fn bool() -> Self {
        Type::new("bool", Sort::Bool)
    }

    pub fn data() -> Self {
        Type::new("data", Sort::Data)
    }

    pub fn void() -> Self {
        Type::new("void", Sort::Void)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.get(name)
    }

    /// Structural identity: two pointer types are the "same struct" when
    /// their name matches (field tables are immutable once constructed).
    pub fn same_struct(&self, other: &Type) -> bool {
        self.sort == Sort::Pointer && other.sort == Sort::Pointer && self.name == other.name
    }

    /// Assignability per spec.md §3: equal types, pointer-to-same-struct, or
    /// any value to void.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if target.sort == Sort::Void {
            return true;
        }
        if self.name == target.name && self.sort == target.sort {
            return true;
        }
        self.same_struct(target)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.sort == other.sort
    }
}
impl Eq for Type {}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

static NEXT_DECL_ID: AtomicUsize = AtomicUsize::new(0);

/// A declared program variable: a global (shared) or a local (parameter or
/// scope-introduced) variable. Two declarations compare equal by identity,
/// not by name (spec.md §3) — `rename_variables` relies on this: renaming a
/// declaration's `name` field never changes which declaration a
/// `VariableExpression` refers to.
#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    id: usize,
    pub name: String,
    pub ty: Type,
    pub is_shared: bool,
}

impl VariableDeclaration {
    pub fn new(name: impl Into<String>, ty: Type, is_shared: bool) -> Arc<Self> {
        Arc::new(VariableDeclaration {
            id: NEXT_DECL_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            ty,
            is_shared,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl PartialEq for VariableDeclaration {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for VariableDeclaration {}

impl std::hash::Hash for VariableDeclaration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for VariableDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_compare_by_identity_not_name() {
        let a = VariableDeclaration::new("x", Type::data(), false);
        let b = VariableDeclaration::new("x", Type::data(), false);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn assignability_allows_void_target() {
        assert!(Type::data().assignable_to(&Type::void()));
        assert!(!Type::void().assignable_to(&Type::data()));
    }

    #[test]
    fn assignability_allows_same_struct_pointers() {
        let node_a = Type::with_fields("Node", BTreeMap::new());
        let node_b = Type::with_fields("Node", BTreeMap::new());
        assert!(node_a.assignable_to(&node_b));
    }
}
