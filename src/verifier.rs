//! The verification driver (spec.md §4.5), grounded on `database.rs`'s
//! lazy/cached-result `Database` and its `Executor`/`Promise` thread pool:
//! `Verifier` normalizes a program once, then runs each interface
//! function's fixed-point loop independently, in parallel, caching every
//! result it computes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::panic;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Instant;

use crate::ast::command::Command;
use crate::ast::stmt::{Function, FunctionKind, Program, Scope, Statement};
use crate::config::{SolverConfig, VerifierOptions};
use crate::encoder::implication::Encoder;
use crate::encoder::SmtBackend;
use crate::error::VerificationError;
use crate::logic::formula::{Annotation, ObligationAxiom, SymbolicValue};
use crate::logic::symbol::SymbolFactory;
use crate::logic::util::collect;
use crate::normalize::normalize_program;
use crate::solver;
use crate::solver::effect::{apply_effects, HeapEffect};
use crate::solver::join::join;
use crate::solver::widen::widen;

/// Wraps a heap-allocated closure with a difficulty score used for
/// dispatch ordering, copied from `database.rs`'s `Job`.
struct Job(usize, Box<dyn FnMut() + Send>);
impl PartialEq for Job {
    fn eq(&self, other: &Job) -> bool {
        self.0 == other.0
    }
}
impl Eq for Job {}
impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Job) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Job {
    fn cmp(&self, other: &Job) -> Ordering {
        self.0.cmp(&other.0)
    }
}

fn queue_work(exec: &Executor, estimate: usize, mut f: Box<dyn FnMut() + Send>) {
    if exec.concurrency <= 1 {
        f();
        return;
    }
    let mut wq = exec.mutex.lock().unwrap();
    wq.push(Job(estimate, f));
    exec.work_cv.notify_one();
}

/// A thread pool for running independent interface functions' fixed-point
/// loops concurrently, copied and generalized from `database.rs`'s
/// `Executor` (same dispatch-by-estimated-cost, same panic-safe `Promise`
/// handoff — generalized here to not depend on any Metamath-specific type).
#[derive(Clone)]
pub struct Executor {
    concurrency: usize,
    mutex: Arc<Mutex<BinaryHeap<Job>>>,
    work_cv: Arc<Condvar>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let g = self.mutex.lock().unwrap();
        write!(f, "Executor(queued={})", g.len())
    }
}

impl Executor {
    pub fn new(concurrency: usize) -> Executor {
        let mutex = Arc::new(Mutex::new(BinaryHeap::new()));
        let cv = Arc::new(Condvar::new());
        if concurrency > 1 {
            for _ in 0..concurrency {
                let mutex = mutex.clone();
                let cv = cv.clone();
                thread::spawn(move || loop {
                    let mut task: Job = {
                        let mut guard = mutex.lock().unwrap();
                        while guard.is_empty() {
                            guard = cv.wait(guard).unwrap();
                        }
                        guard.pop().unwrap()
                    };
                    (task.1)();
                });
            }
        }
        Executor { concurrency, mutex, work_cv: cv }
    }

    pub fn exec<TASK, RV>(&self, estimate: usize, task: TASK) -> Promise<RV>
    where
        TASK: FnOnce() -> RV + Send + 'static,
        RV: Send + 'static,
    {
        let parts = Arc::new((Mutex::new(None), Condvar::new()));
        let partsc = parts.clone();
        let mut tasko = Some(task);
        queue_work(
            self,
            estimate,
            Box::new(move || {
                let mut g = partsc.0.lock().unwrap();
                let taskf = panic::AssertUnwindSafe(tasko.take().expect("should only be called once"));
                *g = Some(panic::catch_unwind(taskf));
                partsc.1.notify_one();
            }),
        );
        Promise::new_once(move || {
            let mut g = parts.0.lock().unwrap();
            while g.is_none() {
                g = parts.1.wait(g).unwrap();
            }
            g.take().unwrap().unwrap()
        })
    }
}

/// A handle for a value computed on the `Executor`'s thread pool, copied
/// from `database.rs`'s `Promise`.
pub struct Promise<T>(Box<dyn FnMut() -> T + Send>);

impl<T> Promise<T> {
    pub fn wait(mut self) -> T {
        (self.0)()
    }

    pub fn new_once<FN>(fun: FN) -> Promise<T>
    where
        FN: FnOnce() -> T + Send + 'static,
    {
        let mut funcell = Some(fun);
        Promise(Box::new(move || (funcell.take().unwrap())()))
    }

    pub fn new(value: T) -> Self
    where
        T: Send + 'static,
    {
        Promise::new_once(move || value)
    }

    pub fn join(promises: Vec<Promise<T>>) -> Promise<Vec<T>>
    where
        T: 'static,
    {
        Promise::new_once(move || promises.into_iter().map(|p| p.wait()).collect())
    }
}

/// One interface function's verdict (spec.md §4.5 state machine's terminal
/// states, collapsed to the three outcomes `Verifier::verify_result`
/// reports per function).
#[derive(Debug, Clone)]
pub enum FunctionVerdict {
    /// Reached `STABLE` with every obligation fulfilled.
    Linearizable,
    /// Reached `STABLE`, but at least one obligation was never discharged.
    NotLinearizable { unfulfilled: Vec<String> },
    /// The fixed-point loop aborted with a `VerificationError`.
    VerificationError(VerificationError),
}

/// One function's outcome plus optional timing, cached by `Verifier`.
#[derive(Debug, Clone)]
pub struct FixedPointResult {
    pub function: String,
    pub verdict: FunctionVerdict,
    pub elapsed: Option<std::time::Duration>,
}

/// The combined result of verifying every interface function in a program
/// (spec.md §6 ambient addition).
#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub functions: Vec<FixedPointResult>,
}

impl VerifyResult {
    /// `LINEARIZABLE` iff every interface function is.
    pub fn is_linearizable(&self) -> bool {
        self.functions
            .iter()
            .all(|f| matches!(f.verdict, FunctionVerdict::Linearizable))
    }
}

impl fmt::Display for VerifyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.functions {
            match &result.verdict {
                FunctionVerdict::Linearizable => writeln!(f, "{}: LINEARIZABLE", result.function)?,
                FunctionVerdict::NotLinearizable { unfulfilled } => {
                    writeln!(f, "{}: NOT LINEARIZABLE (unfulfilled: {})", result.function, unfulfilled.join(", "))?
                }
                FunctionVerdict::VerificationError(err) => {
                    writeln!(f, "{}: VERIFICATION ERROR: {err}", result.function)?
                }
            }
        }
        Ok(())
    }
}

/// Drives normalization and per-function verification over one `Program`,
/// caching every stage it computes, mirroring `Database`'s lazy-result
/// pattern (`normalized`/`function_result`/`verify_result`).
pub struct Verifier<B: SmtBackend> {
    program: Program,
    config: SolverConfig,
    options: VerifierOptions,
    normalized: Option<Arc<Program>>,
    verify_result: Option<Arc<VerifyResult>>,
    make_backend: Box<dyn Fn() -> B + Send + Sync>,
}

impl<B: SmtBackend + Send + 'static> Verifier<B> {
    pub fn new(program: Program, config: SolverConfig, options: VerifierOptions, make_backend: impl Fn() -> B + Send + Sync + 'static) -> Self {
        Verifier {
            program,
            config,
            options,
            normalized: None,
            verify_result: None,
            make_backend: Box::new(make_backend),
        }
    }

    pub fn normalized(&mut self) -> Result<&Arc<Program>, VerificationError> {
        if self.normalized.is_none() {
            let normalized = normalize_program(self.program.clone())
                .map_err(VerificationError::Transformation)?;
            self.normalized = Some(Arc::new(normalized));
        }
        Ok(self.normalized.as_ref().unwrap())
    }

    /// Computes and caches the combined verdict, dispatching each interface
    /// function's fixed-point loop on the `Executor` thread pool (spec.md
    /// §4.5, §5: parallel across functions, never within one).
    ///
    /// A single pass would verify every function as though it ran alone.
    /// Since the verified program is multi-threaded (spec.md §5), every
    /// function's run also collects the `HeapEffect`s its shared-memory
    /// writes produce; those are folded back in as interference on *every*
    /// function's next run, and the whole thing is repeated until the set of
    /// known effects stops growing — a global fixed point across all
    /// interface functions, not just within one.
    pub fn verify_result(&mut self) -> Result<&Arc<VerifyResult>, VerificationError> {
        if self.verify_result.is_some() {
            return Ok(self.verify_result.as_ref().unwrap());
        }
        let program = self.normalized()?.clone();
        let jobs = if self.options.jobs == 0 { num_cpus_fallback() } else { self.options.jobs };
        let timing = self.options.timing;
        let config = self.config.clone();
        let make_backend = &self.make_backend;

        // Run the initializer exactly once, not once per function: every
        // interface function's run must start from the *same* global
        // bindings for interference (matching a shared resource by its node
        // symbol across two different functions' runs) to mean anything.
        let mut init_encoder = Encoder::new((make_backend)());
        let mut init_factory = SymbolFactory::new();
        let initial = run_initializer(&program, &mut init_encoder, &config, &mut init_factory)?;

        let mut known_effects: Vec<HeapEffect> = Vec::new();
        let mut functions = Vec::new();
        for _ in 0..MAX_INTERFERENCE_ROUNDS {
            let executor = Executor::new(jobs);
            let mut promises = Vec::new();
            for function in program.interface_functions() {
                let function = function.clone();
                let config = config.clone();
                let backend = (make_backend)();
                let initial = initial.clone();
                let effects = known_effects.clone();
                let estimate = estimate_statement_size(&function.body.body);
                promises.push(executor.exec(estimate, move || {
                    let start = Instant::now();
                    let (verdict, discovered) = run_function(&initial, &function, &config, backend, &effects);
                    (
                        FixedPointResult {
                            function: function.name.clone(),
                            verdict,
                            elapsed: timing.then(|| start.elapsed()),
                        },
                        discovered,
                    )
                }));
            }

            let results = Promise::join(promises).wait();
            let mut next_effects = known_effects.clone();
            for (_, discovered) in &results {
                next_effects.extend(discovered.iter().cloned());
            }
            let next_effects = dedupe_effects(next_effects);
            let stabilized = effect_keys(&next_effects) == effect_keys(&known_effects);
            functions = results.into_iter().map(|(result, _)| result).collect();
            known_effects = next_effects;
            if stabilized {
                break;
            }
        }

        self.verify_result = Some(Arc::new(VerifyResult { functions }));
        Ok(self.verify_result.as_ref().unwrap())
    }
}

/// Bounds the outer interference fixed point: each round can only add
/// effects already reachable from the program's (finite) set of memory
/// writes, so this is a generous non-termination backstop, not a tuning
/// knob expected to bind in practice.
const MAX_INTERFERENCE_ROUNDS: usize = 16;

fn effect_key(effect: &HeapEffect) -> String {
    let fields = |axiom: &crate::logic::formula::MemoryAxiom| {
        axiom.fields.iter().map(|(field, value)| format!("{field}={value}")).collect::<Vec<_>>().join(",")
    };
    format!("{}|{}|{}", effect.pre.node, fields(&effect.pre), fields(&effect.post))
}

fn effect_keys(effects: &[HeapEffect]) -> std::collections::HashSet<String> {
    effects.iter().map(effect_key).collect()
}

fn dedupe_effects(effects: Vec<HeapEffect>) -> Vec<HeapEffect> {
    let mut seen = std::collections::HashSet::new();
    effects.into_iter().filter(|e| seen.insert(effect_key(e))).collect()
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn estimate_statement_size(stmt: &Statement) -> usize {
    match stmt {
        Statement::Command(_) => 1,
        Statement::Sequence(a, b) => estimate_statement_size(a) + estimate_statement_size(b),
        Statement::Scope(s) | Statement::Atomic(s) | Statement::Loop(s) => 1 + estimate_statement_size(&s.body),
        Statement::Choice(branches) => branches.iter().map(|s| estimate_statement_size(&s.body)).sum::<usize>() + 1,
        Statement::While(_, s) | Statement::DoWhile(s, _) => 1 + estimate_statement_size(&s.body),
        Statement::IfThenElse(_, a, b) => 1 + estimate_statement_size(&a.body) + estimate_statement_size(&b.body),
    }
}

/// Runs one interface function's fixed-point loop starting from `initial`
/// (the program initializer's shared result), treating `known_effects` as
/// interference already discovered from other functions' runs, and returns
/// both its verdict and the heap effects its own steps produced this time —
/// the caller folds those into the next round's `known_effects` (spec.md
/// §5).
fn run_function<B: SmtBackend>(
    initial: &Annotation,
    function: &Function,
    config: &SolverConfig,
    backend: B,
    known_effects: &[HeapEffect],
) -> (FunctionVerdict, Vec<HeapEffect>) {
    let mut encoder = Encoder::new(backend);
    let mut factory = SymbolFactory::new();
    let mut collected = Vec::new();

    let outcome: Result<_, VerificationError> = (|| {
        let params_bound = vec![crate::solver::scope::post_enter(initial, &mut factory, &function.parameters)?];
        let mut ctx = Ctx {
            encoder: &mut encoder,
            config,
            factory: &mut factory,
            known_effects,
            collected: &mut collected,
            in_atomic: false,
        };
        let outcome = exec_scope_body(&function.body, params_bound, &mut ctx)?;

        let mut final_states: Vec<Annotation> = outcome.continuing;
        let mut candidate_results = Vec::new();
        for (annotation, values) in outcome.returning {
            candidate_results.extend(values);
            final_states.push(annotation);
        }
        if final_states.is_empty() {
            final_states.push(Annotation::empty());
        }

        let joined = join(&mut encoder, &final_states);
        let widened = widen(&mut encoder, &joined);
        let searched = crate::solver::fulfillment::search_fulfillments(&mut encoder, &widened, &candidate_results);

        let obligations: Vec<ObligationAxiom> =
            collect::<ObligationAxiom>(&searched.now, |_| true).into_iter().cloned().collect();
        let fulfillments: Vec<_> = collect::<crate::logic::formula::FulfillmentAxiom>(&searched.now, |_| true);
        let unfulfilled: Vec<String> = obligations
            .iter()
            .filter(|o| !fulfillments.iter().any(|f| f.kind == o.kind && f.arg == o.arg))
            .map(|o| o.kind.0.to_string())
            .collect();

        Ok(unfulfilled)
    })();

    let verdict = match outcome {
        Ok(unfulfilled) if unfulfilled.is_empty() => FunctionVerdict::Linearizable,
        Ok(unfulfilled) => FunctionVerdict::NotLinearizable { unfulfilled },
        Err(err) => FunctionVerdict::VerificationError(err),
    };
    (verdict, collected)
}

/// Runs the program initializer once from an empty annotation to establish
/// the shared state every interface function's fixed point starts from.
/// Globals are bound to fresh symbols via `PostEnter` before the
/// initializer body runs, the same way a function's parameters are bound
/// before its body — the initializer's job is then to give them their real
/// starting value (e.g. `head = NULL`), exactly as an ordinary `Assignment`
/// of an already-in-scope variable would.
fn run_initializer<B: SmtBackend>(
    program: &Program,
    encoder: &mut Encoder<B>,
    config: &SolverConfig,
    factory: &mut SymbolFactory,
) -> Result<Annotation, VerificationError> {
    let base = crate::solver::scope::post_enter(&Annotation::empty(), factory, &program.globals)?;
    let mut collected = Vec::new();
    let mut ctx = Ctx {
        encoder,
        config,
        factory,
        known_effects: &[],
        collected: &mut collected,
        in_atomic: false,
    };
    let outcome = exec_scope_body(&program.initializer, vec![base], &mut ctx)?;
    Ok(outcome.continuing.into_iter().next().unwrap_or_else(Annotation::empty))
}

struct Ctx<'a, B: SmtBackend> {
    encoder: &'a mut Encoder<B>,
    config: &'a SolverConfig,
    factory: &'a mut SymbolFactory,
    /// Heap effects already known from other functions' runs, folded in as
    /// interference before every non-atomic command (spec.md §5).
    known_effects: &'a [HeapEffect],
    /// Heap effects this run's own steps have produced, for the driver to
    /// fold into the next round's `known_effects`.
    collected: &'a mut Vec<HeapEffect>,
    /// Suppresses interference injection for the body of an `Atomic` scope,
    /// whose constituent steps compose without intervening interference
    /// (spec.md §5).
    in_atomic: bool,
}

/// The three ways executing a statement from a set of input annotations can
/// leave the current function: falling through normally, hitting `break`
/// (propagated up to the nearest enclosing `Loop`), or hitting `return`
/// (propagated all the way out of the function, carrying the evaluated
/// return expressions). `continue` is folded into `continuing` at the
/// `Loop` boundary — this core has no statement after a bare `continue`
/// within the same block that could observe the difference.
#[derive(Default)]
struct ExecOutcome {
    continuing: Vec<Annotation>,
    breaking: Vec<Annotation>,
    returning: Vec<(Annotation, Vec<SymbolicValue>)>,
}

fn exec_scope_body<B: SmtBackend>(scope: &Scope, inputs: Vec<Annotation>, ctx: &mut Ctx<B>) -> Result<ExecOutcome, VerificationError> {
    let mut bound = Vec::with_capacity(inputs.len());
    for annotation in inputs {
        bound.push(crate::solver::scope::post_enter(&annotation, ctx.factory, &scope.variables)?);
    }
    let mut outcome = exec_statement(&scope.body, bound, ctx)?;
    outcome.continuing = outcome
        .continuing
        .into_iter()
        .map(|a| crate::solver::scope::post_leave(&a, &scope.variables))
        .collect();
    Ok(outcome)
}

fn exec_statement<B: SmtBackend>(stmt: &Statement, inputs: Vec<Annotation>, ctx: &mut Ctx<B>) -> Result<ExecOutcome, VerificationError> {
    if inputs.is_empty() {
        return Ok(ExecOutcome::default());
    }
    match stmt {
        Statement::Command(Command::Break) => Ok(ExecOutcome { breaking: inputs, ..Default::default() }),
        Statement::Command(Command::Continue) => Ok(ExecOutcome { continuing: inputs, ..Default::default() }),
        Statement::Command(Command::Return(exprs)) => {
            let mut returning = Vec::with_capacity(inputs.len());
            for annotation in inputs {
                let mut values = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    values.push(crate::logic::eval::eval_expr(&annotation, expr)?);
                }
                returning.push((annotation, values));
            }
            Ok(ExecOutcome { returning, ..Default::default() })
        }
        Statement::Command(cmd) => {
            let mut continuing = Vec::new();
            for annotation in inputs {
                // Outside an atomic block, any shared-memory read may
                // witness another thread's already-discovered effects
                // (spec.md §5) — fold them in right before the command runs.
                let annotation = if ctx.in_atomic {
                    annotation
                } else {
                    apply_effects(&annotation, ctx.factory, ctx.known_effects)
                };
                let image = solver::post(ctx.encoder, ctx.config, ctx.factory, &annotation, cmd)?;
                ctx.collected.extend(image.effects.iter().cloned());
                continuing.extend(image.successors);
            }
            Ok(ExecOutcome { continuing, ..Default::default() })
        }
        Statement::Sequence(first, second) => {
            let first_outcome = exec_statement(first, inputs, ctx)?;
            let second_outcome = exec_statement(second, first_outcome.continuing, ctx)?;
            Ok(ExecOutcome {
                continuing: second_outcome.continuing,
                breaking: merge(first_outcome.breaking, second_outcome.breaking),
                returning: merge(first_outcome.returning, second_outcome.returning),
            })
        }
        Statement::Scope(scope) => exec_scope_body(scope, inputs, ctx),
        // The constituent steps of an atomic block compose without
        // intervening interference (spec.md §5) — suppress interference
        // injection for the duration of the nested body, then restore.
        Statement::Atomic(scope) => {
            let was_atomic = std::mem::replace(&mut ctx.in_atomic, true);
            let result = exec_scope_body(scope, inputs, ctx);
            ctx.in_atomic = was_atomic;
            result
        }
        Statement::Choice(branches) => {
            let mut continuing = Vec::new();
            let mut breaking = Vec::new();
            let mut returning = Vec::new();
            for branch in branches {
                let outcome = exec_scope_body(branch, inputs.clone(), ctx)?;
                continuing.extend(outcome.continuing);
                breaking.extend(outcome.breaking);
                returning.extend(outcome.returning);
            }
            Ok(ExecOutcome { continuing, breaking, returning })
        }
        Statement::Loop(scope) => exec_loop(scope, inputs, ctx),
        Statement::While(..) | Statement::DoWhile(..) | Statement::IfThenElse(..) => {
            Err(VerificationError::UnsupportedConstruct {
                description: "conditional control flow must be eliminated by normalization before reaching the verifier".into(),
            })
        }
    }
}

fn merge<T>(mut a: Vec<T>, b: Vec<T>) -> Vec<T> {
    a.extend(b);
    a
}

/// Loop-head fixed point: widen then join against the previous head
/// annotation until `Implies(previous, current)` holds, bounded by a
/// generous iteration cap as a non-termination backstop.
const MAX_LOOP_ITERATIONS: usize = 64;

fn exec_loop<B: SmtBackend>(scope: &Scope, inputs: Vec<Annotation>, ctx: &mut Ctx<B>) -> Result<ExecOutcome, VerificationError> {
    let mut bound = Vec::with_capacity(inputs.len());
    for annotation in &inputs {
        bound.push(crate::solver::scope::post_enter(annotation, ctx.factory, &scope.variables)?);
    }
    let mut head = join(ctx.encoder, &bound);
    let mut breaking = Vec::new();

    for iteration in 0..MAX_LOOP_ITERATIONS {
        if iteration > 0 {
            head = widen(ctx.encoder, &head);
        }
        let outcome = exec_statement(&scope.body, vec![head.clone()], ctx)?;
        breaking.extend(outcome.breaking.iter().cloned());

        if outcome.continuing.is_empty() {
            break;
        }
        let next = join(ctx.encoder, &outcome.continuing);
        if ctx.encoder.entails(&next.now, &head.now) {
            break;
        }
        head = next;
    }

    let breaking: Vec<Annotation> = breaking
        .into_iter()
        .map(|a| crate::solver::scope::post_leave(&a, &scope.variables))
        .collect();
    Ok(ExecOutcome { continuing: breaking, ..Default::default() })
}
