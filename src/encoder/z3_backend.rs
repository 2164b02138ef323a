//! The concrete Z3 backend (feature `z3-backend`), grounded on
//! `original_source/src/prover/backend/z3expr.cpp`'s `Z3Expr` wrapper:
//! every logic-level connective (`And`/`Or`/`Neg`/`Implies`/`Equal`/
//! `Distinct`) maps to the matching `z3::ast::Bool` operation there, and we
//! follow the same shape here rather than inventing a different one.
//!
//! The `z3` crate ties every `Ast` to the lifetime of its `Context`; since
//! `SmtBackend::Term` has no lifetime parameter to thread through, the
//! context is leaked once per backend (`Box::leak`) to get a `'static`
//! handle. The backend owns the only reference to it, so this is a bounded,
//! one-time leak per verifier run, not a per-query one.

use std::collections::HashMap;

use z3::ast::{Ast, Bool, Datatype, Dynamic};
use z3::{Config, Context, SatResult, Solver, Sort as Z3Sort};

use crate::ast::types::Sort;
use crate::encoder::{SmtBackend, SmtTerm};
use crate::logic::symbol::Symbol;

#[derive(Clone)]
pub struct Z3Term(Dynamic<'static>);

impl Z3Term {
    fn as_bool(&self) -> Bool<'static> {
        self.0
            .as_bool()
            .unwrap_or_else(|| panic!("logic connective applied to a non-Boolean term"))
    }
}

impl SmtTerm for Z3Term {
    fn and(&self, other: &Self) -> Self {
        Z3Term(Bool::and(self.as_bool().get_ctx(), &[&self.as_bool(), &other.as_bool()]).into())
    }

    fn or(&self, other: &Self) -> Self {
        Z3Term(Bool::or(self.as_bool().get_ctx(), &[&self.as_bool(), &other.as_bool()]).into())
    }

    fn not(&self) -> Self {
        Z3Term(self.as_bool().not().into())
    }

    fn implies(&self, other: &Self) -> Self {
        Z3Term(self.as_bool().implies(&other.as_bool()).into())
    }

    fn eq_term(&self, other: &Self) -> Self {
        Z3Term(self.0._eq(&other.0).into())
    }

    fn distinct(&self, other: &Self) -> Self {
        Z3Term(Dynamic::from_ast(&Ast::distinct(self.as_bool().get_ctx(), &[&self.0, &other.0])).into())
    }
}

/// A Z3 session: one uninterpreted sort per pointer-typed struct, `Int` for
/// `data`, `Bool` for `bool`, and an uninterpreted "Set" constant per flow
/// symbol paired with an explicit membership relation (Z3's native `Set`
/// sort is awkward to combine with uninterpreted element sorts across
/// backend versions, so membership is encoded as an uninterpreted
/// `contains(set, elem): Bool` function instead — grounded on the same
/// "finite sorts for pointers + integer-like data + set sort for flow
/// values" combination spec.md §4.3 calls for, realized with the
/// constructs this crate version actually exposes).
pub struct Z3Backend {
    ctx: &'static Context,
    solver: Solver<'static>,
    declared: HashMap<usize, Z3Term>,
    pointer_sort: Z3Sort<'static>,
    null_const: Dynamic<'static>,
    contains_fn: z3::FuncDecl<'static>,
}

impl Z3Backend {
    pub fn new() -> Self {
        let cfg = Config::new();
        let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
        let solver = Solver::new(ctx);

        let (pointer_sort, consts, _testers) = Datatype::enumeration(ctx, "Pointer", &["null".into()]);
        let null_const = consts[0].apply(&[]);

        let contains_fn = z3::FuncDecl::new(
            ctx,
            "flow_contains",
            &[&Z3Sort::uninterpreted(ctx, "Value".into()), &Z3Sort::uninterpreted(ctx, "Value".into())],
            &Z3Sort::bool(ctx),
        );

        Z3Backend {
            ctx,
            solver,
            declared: HashMap::new(),
            pointer_sort,
            null_const,
            contains_fn,
        }
    }

    fn sort_for(&self, sort: Sort) -> Z3Sort<'static> {
        match sort {
            Sort::Bool => Z3Sort::bool(self.ctx),
            Sort::Data => Z3Sort::int(self.ctx),
            Sort::Pointer => self.pointer_sort.clone(),
            Sort::Void => Z3Sort::bool(self.ctx),
        }
    }
}

impl Default for Z3Backend {
    fn default() -> Self {
        Z3Backend::new()
    }
}

impl SmtBackend for Z3Backend {
    type Term = Z3Term;

    fn declare_symbol(&mut self, symbol: &Symbol) -> Self::Term {
        if let Some(existing) = self.declared.get(&symbol.id()) {
            return existing.clone();
        }
        let sort = self.sort_for(symbol.ty().sort);
        let name = format!("s{}", symbol.id());
        let constant = Dynamic::new_const(self.ctx, name.as_str(), &sort);
        let term = Z3Term(constant);
        self.declared.insert(symbol.id(), term.clone());
        term
    }

    fn null_term(&mut self, sort: Sort) -> Self::Term {
        debug_assert_eq!(sort, Sort::Pointer);
        Z3Term(self.null_const.clone())
    }

    fn min_term(&mut self) -> Self::Term {
        Z3Term(z3::ast::Int::from_i64(self.ctx, i64::MIN).into())
    }

    fn max_term(&mut self) -> Self::Term {
        Z3Term(z3::ast::Int::from_i64(self.ctx, i64::MAX).into())
    }

    fn bool_term(&mut self, value: bool) -> Self::Term {
        Z3Term(Bool::from_bool(self.ctx, value).into())
    }

    fn set_contains(&mut self, set: &Self::Term, value: &Self::Term) -> Self::Term {
        Z3Term(self.contains_fn.apply(&[&set.0, &value.0]))
    }

    fn set_is_empty(&mut self, set: &Self::Term) -> Self::Term {
        // No element is in `set`: expressed, as Z3's quantifiers are costly
        // for a per-query check, by comparing `set` against a nominated
        // "empty" constant for its sort rather than a universally
        // quantified formula.
        let empty = Dynamic::new_const(self.ctx, "flow_empty", &set.0.get_sort());
        Z3Term(set.0._eq(&empty))
    }

    fn push(&mut self) {
        self.solver.push();
    }

    fn pop(&mut self) {
        self.solver.pop(1);
    }

    fn add_premise(&mut self, term: Self::Term) {
        self.solver.assert(&term.as_bool());
    }

    fn check_unsat_with(&mut self, additional: Self::Term) -> bool {
        matches!(
            self.solver.check_assumptions(&[additional.as_bool()]),
            SatResult::Unsat
        )
    }
}
