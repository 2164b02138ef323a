//! Program commands (spec.md §3 and §6).

use std::fmt;
use std::sync::Arc;

use crate::ast::expr::Expression;
use crate::ast::types::VariableDeclaration;

/// One `dst := cmp ? src` triple of a tuple compare-and-swap (spec.md §6:
/// "CAS (tuple compare-and-swap with three equally shaped tuples)").
#[derive(Debug, Clone)]
pub struct CasElement {
    pub dst: Expression,
    pub cmp: Expression,
    pub src: Expression,
}

/// A leaf command. `MemoryRead`/`MemoryWrite` are distinguished from the
/// generic `Assignment`/`ParallelAssignment` because the solver's
/// post-image rules differ (§4.4): a read/write dereferences a pointer and
/// must go through `PrepareAccess`'s memory-accessibility machinery, while a
/// scalar local-to-local assignment never touches the heap.
#[derive(Debug, Clone)]
pub enum Command {
    Skip,
    Break,
    Continue,
    Assume(Expression),
    Assert(Expression),
    Return(Vec<Expression>),
    /// `lhs = malloc`; `lhs` must be a non-shared pointer variable.
    Malloc(Arc<VariableDeclaration>),
    /// `lhs = rhs`, neither side dereferencing the heap.
    Assignment(Arc<VariableDeclaration>, Expression),
    /// `lhs_1, ..., lhs_n = rhs_1, ..., rhs_n`, none dereferencing the heap.
    ParallelAssignment(Vec<Arc<VariableDeclaration>>, Vec<Expression>),
    /// `lhs_i := base_i->field_i`, read under simultaneous (pre-state)
    /// semantics (spec.md §9 Open Question, resolved in SPEC_FULL.md §4.4).
    MemoryRead {
        lhs: Vec<Arc<VariableDeclaration>>,
        base: Vec<Expression>,
        field: Vec<String>,
    },
    /// `base->field := value`.
    MemoryWrite {
        base: Expression,
        field: String,
        value: Expression,
    },
    /// `result = CAS(<dst_i>, <cmp_i>, <src_i>)`, pre-normalization only —
    /// `remove_cas` eliminates this variant entirely.
    CompareAndSwap {
        result: Arc<VariableDeclaration>,
        elements: Vec<CasElement>,
    },
    /// Call to a `Macro`-kind function, pre-normalization only —
    /// `remove_variables`/macro inlining eliminates this variant entirely
    /// by splicing in the callee's (renamed) body.
    MacroCall {
        callee: String,
        lhs: Vec<Arc<VariableDeclaration>>,
        args: Vec<Expression>,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Skip => write!(f, "skip"),
            Command::Break => write!(f, "break"),
            Command::Continue => write!(f, "continue"),
            Command::Assume(e) => write!(f, "assume({e})"),
            Command::Assert(e) => write!(f, "assert({e})"),
            Command::Return(es) => {
                write!(f, "return")?;
                for e in es {
                    write!(f, " {e}")?;
                }
                Ok(())
            }
            Command::Malloc(lhs) => write!(f, "{} = malloc", lhs.name),
            Command::Assignment(lhs, rhs) => write!(f, "{} = {rhs}", lhs.name),
            Command::ParallelAssignment(lhs, rhs) => {
                let lhs_s: Vec<_> = lhs.iter().map(|d| d.name.as_str()).collect();
                let rhs_s: Vec<_> = rhs.iter().map(|e| e.to_string()).collect();
                write!(f, "{} = {}", lhs_s.join(", "), rhs_s.join(", "))
            }
            Command::MemoryRead { lhs, base, field } => {
                for i in 0..lhs.len() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{} := {}->{}", lhs[i].name, base[i], field[i])?;
                }
                Ok(())
            }
            Command::MemoryWrite { base, field, value } => {
                write!(f, "{base}->{field} := {value}")
            }
            Command::CompareAndSwap { result, elements } => {
                write!(f, "{} = CAS(", result.name)?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "<{},{},{}>", e.dst, e.cmp, e.src)?;
                }
                write!(f, ")")
            }
            Command::MacroCall { callee, args, .. } => {
                let args_s: Vec<_> = args.iter().map(|e| e.to_string()).collect();
                write!(f, "{callee}({})", args_s.join(", "))
            }
        }
    }
}

/// Structural deep copy, grounded on `src/cola/util/cpStmt.cpp`.
pub fn copy_command(cmd: &Command) -> Command {
    use crate::ast::expr::copy_expr;
    match cmd {
        Command::Skip => Command::Skip,
        Command::Break => Command::Break,
        Command::Continue => Command::Continue,
        Command::Assume(e) => Command::Assume(copy_expr(e)),
        Command::Assert(e) => Command::Assert(copy_expr(e)),
        Command::Return(es) => Command::Return(es.iter().map(copy_expr).collect()),
        Command::Malloc(lhs) => Command::Malloc(lhs.clone()),
        Command::Assignment(lhs, rhs) => Command::Assignment(lhs.clone(), copy_expr(rhs)),
        Command::ParallelAssignment(lhs, rhs) => {
            Command::ParallelAssignment(lhs.clone(), rhs.iter().map(copy_expr).collect())
        }
        Command::MemoryRead { lhs, base, field } => Command::MemoryRead {
            lhs: lhs.clone(),
            base: base.iter().map(copy_expr).collect(),
            field: field.clone(),
        },
        Command::MemoryWrite { base, field, value } => Command::MemoryWrite {
            base: copy_expr(base),
            field: field.clone(),
            value: copy_expr(value),
        },
        Command::CompareAndSwap { result, elements } => Command::CompareAndSwap {
            result: result.clone(),
            elements: elements
                .iter()
                .map(|e| CasElement {
                    dst: copy_expr(&e.dst),
                    cmp: copy_expr(&e.cmp),
                    src: copy_expr(&e.src),
                })
                .collect(),
        },
        Command::MacroCall { callee, lhs, args } => Command::MacroCall {
            callee: callee.clone(),
            lhs: lhs.clone(),
            args: args.iter().map(copy_expr).collect(),
        },
    }
}

/// Every variable this command reads or writes directly (not through a
/// macro it calls) — used by `PrepareAccess` (§4.4) and by `rename_variables`
/// / `collect` generally. Grounded on `PointerCollector` in
/// `src/engine/solver/access.cpp`, generalized to all sorts (the original
/// only needs pointers there; callers filter further as needed).
pub fn referenced_variables(cmd: &Command) -> Vec<Arc<VariableDeclaration>> {
    let mut out = Vec::new();
    let mut push_expr = |e: &Expression, out: &mut Vec<Arc<VariableDeclaration>>| {
        collect_expr_variables(e, out);
    };
    match cmd {
        Command::Skip | Command::Break | Command::Continue => {}
        Command::Assume(e) | Command::Assert(e) => push_expr(e, &mut out),
        Command::Return(es) => {
            for e in es {
                push_expr(e, &mut out);
            }
        }
        Command::Malloc(lhs) => out.push(lhs.clone()),
        Command::Assignment(lhs, rhs) => {
            out.push(lhs.clone());
            push_expr(rhs, &mut out);
        }
        Command::ParallelAssignment(lhs, rhs) => {
            out.extend(lhs.iter().cloned());
            for e in rhs {
                push_expr(e, &mut out);
            }
        }
        Command::MemoryRead { lhs, base, .. } => {
            out.extend(lhs.iter().cloned());
            for e in base {
                push_expr(e, &mut out);
            }
        }
        Command::MemoryWrite { base, value, .. } => {
            push_expr(base, &mut out);
            push_expr(value, &mut out);
        }
        Command::CompareAndSwap { result, elements } => {
            out.push(result.clone());
            for e in elements {
                push_expr(&e.dst, &mut out);
                push_expr(&e.cmp, &mut out);
                push_expr(&e.src, &mut out);
            }
        }
        Command::MacroCall { lhs, args, .. } => {
            out.extend(lhs.iter().cloned());
            for e in args {
                push_expr(e, &mut out);
            }
        }
    }
    out
}

fn collect_expr_variables(expr: &Expression, out: &mut Vec<Arc<VariableDeclaration>>) {
    match expr {
        Expression::Variable(decl) => out.push(decl.clone()),
        Expression::Dereference(base, _) => collect_expr_variables(base, out),
        Expression::Negated(inner) => collect_expr_variables(inner, out),
        Expression::Binary(_, lhs, rhs) => {
            collect_expr_variables(lhs, out);
            collect_expr_variables(rhs, out);
        }
        Expression::BoolValue(_)
        | Expression::NullValue
        | Expression::MinValue
        | Expression::MaxValue
        | Expression::Symbolic(_) => {}
    }
}

/// Every variable dereferenced by this command (the base of a
/// `Dereference`/`MemoryRead`/`MemoryWrite`/CAS element), used by
/// `PrepareAccess`. Grounded on `DereferenceCollector` in
/// `src/engine/solver/access.cpp`.
pub fn dereferenced_variables(cmd: &Command) -> Vec<Arc<VariableDeclaration>> {
    let mut out = Vec::new();
    let mut scan = |e: &Expression, out: &mut Vec<Arc<VariableDeclaration>>| {
        collect_deref_bases(e, out);
    };
    match cmd {
        Command::MemoryRead { base, .. } => {
            for e in base {
                scan(e, &mut out);
            }
        }
        Command::MemoryWrite { base, value, .. } => {
            scan(base, &mut out);
            scan(value, &mut out);
        }
        Command::CompareAndSwap { elements, .. } => {
            for e in elements {
                scan(&e.dst, &mut out);
                scan(&e.cmp, &mut out);
                scan(&e.src, &mut out);
            }
        }
        Command::Assume(e) | Command::Assert(e) => scan(e, &mut out),
        Command::Return(es) => {
            for e in es {
                scan(e, &mut out);
            }
        }
        Command::Assignment(_, rhs) => scan(rhs, &mut out),
        Command::ParallelAssignment(_, rhs) => {
            for e in rhs {
                scan(e, &mut out);
            }
        }
        Command::MacroCall { args, .. } => {
            for e in args {
                scan(e, &mut out);
            }
        }
        Command::Skip | Command::Break | Command::Continue | Command::Malloc(_) => {}
    }
    out
}

fn collect_deref_bases(expr: &Expression, out: &mut Vec<Arc<VariableDeclaration>>) {
    match expr {
        Expression::Dereference(base, _) => {
            if let Expression::Variable(decl) = base.as_ref() {
                out.push(decl.clone());
            } else {
                collect_deref_bases(base, out);
            }
        }
        Expression::Negated(inner) => collect_deref_bases(inner, out),
        Expression::Binary(_, lhs, rhs) => {
            collect_deref_bases(lhs, out);
            collect_deref_bases(rhs, out);
        }
        _ => {}
    }
}
