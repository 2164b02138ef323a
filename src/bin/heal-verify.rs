//! Standalone driver for `heal_verify`, mirroring the teacher's
//! `metamath-knife` binary: load a program, run the verifier, print a
//! verdict per interface function. There is no surface-syntax parser
//! (spec.md §1 Non-goals), so `--demo` selects one of the built-in
//! `crate::fixtures` programs instead of a source file.

use std::process::ExitCode;

use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Snippet};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use heal_verify::config::{VerifierOptions, WideningPolicy};
use heal_verify::encoder::z3_backend::Z3Backend;
use heal_verify::fixtures;
use heal_verify::verifier::{FunctionVerdict, Verifier};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    TreiberStack,
    /// The same stack, but configured with an invariant a fresh node cannot
    /// satisfy before its fields are written — demonstrates spec.md §8
    /// boundary scenario 5 (malloc invariant violation).
    TreiberStackStrict,
    MichaelSet,
    /// `contains` with a nested scope re-declaring its cursor variable
    /// without leaving the enclosing one — demonstrates spec.md §8 boundary
    /// scenario 6 (variable hiding).
    MichaelSetHiding,
}

/// An automated linearizability verifier for fine-grained concurrent heap
/// data structures.
#[derive(Debug, Parser)]
#[command(name = "heal-verify", version, about)]
struct Cli {
    /// Built-in demo program to verify.
    #[arg(long, value_enum)]
    demo: Demo,

    /// Worker-thread count for the per-function executor (0 = all cores).
    #[arg(long, default_value_t = 0)]
    jobs: usize,

    /// Print per-pass timing to stderr.
    #[arg(long)]
    timing: bool,

    /// Log every fixed-point iteration's annotation (verbose).
    #[arg(long)]
    trace_recalc: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    simple_logger::SimpleLogger::new().with_level(level).init().expect("logger installs exactly once");

    let options = VerifierOptions {
        jobs: cli.jobs,
        timing: cli.timing,
        trace_recalc: cli.trace_recalc,
        widening: WideningPolicy::Fast,
    };

    let (program, config) = match cli.demo {
        Demo::TreiberStack => (fixtures::treiber_stack_program(), fixtures::treiber_stack_config()),
        Demo::TreiberStackStrict => (fixtures::treiber_stack_program(), fixtures::treiber_stack_strict_config()),
        Demo::MichaelSet => (fixtures::michael_set_program(), fixtures::michael_set_config()),
        Demo::MichaelSetHiding => (fixtures::michael_set_hiding_program(), fixtures::michael_set_config()),
    };

    let mut verifier = Verifier::new(program, config, options, Z3Backend::new);
    match verifier.verify_result() {
        Ok(result) => {
            print!("{result}");
            if result.is_linearizable() {
                ExitCode::SUCCESS
            } else {
                for entry in &result.functions {
                    if let FunctionVerdict::VerificationError(err) = &entry.verdict {
                        print_diagnostic(&entry.function, &err.to_string());
                    }
                }
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            print_diagnostic("<normalization>", &err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Renders one verification failure the way `metamath-knife` renders a
/// parse/verify diagnostic: a titled snippet, no source slice (the core has
/// no surface syntax to point into — spec.md §1 Non-goals), just the
/// function name and the error's own `Display` message as the title.
fn print_diagnostic(function: &str, message: &str) {
    let title = format!("`{function}`: {message}");
    let snippet = Snippet {
        title: Some(Annotation {
            id: None,
            label: Some(&title),
            annotation_type: AnnotationType::Error,
        }),
        footer: vec![],
        slices: vec![],
        opt: FormatOptions { color: true, ..Default::default() },
    };
    eprintln!("{}", DisplayList::from(snippet));
}
