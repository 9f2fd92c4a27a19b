//! specgate: contract verification and spec grounding for generated
//! Python/SQLAlchemy codebases.
//!
//! The tool never runs target code. It parses model and migration sources
//! with tree-sitter, flattens mixin inheritance into resolved tables, and
//! compares the result against one of two sources of truth:
//!
//! - a JSON **contract** (`verify`, `verify-legacy`): strict, exit code 1 on
//!   any failed check;
//! - a Markdown **spec** (`ground`): advisory warnings plus a bounded
//!   context document for downstream planning, always exit code 0.
//!
//! Every run prints exactly one JSON document on stdout. Fatal input errors
//! print `{"error": "..."}` and exit with code 2. Source files the parser
//! cannot handle are skipped and listed in the report, never fatal.
//!
//! # Examples
//!
//! ```bash
//! specgate verify feature.contract.json ./backend
//! specgate verify-legacy feature.contract.json .
//! specgate ground docs/specs/projects.md . --format text
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: parsing, walking, configuration, errors and shared types
//! - [`plugins`]: extractors, verifiers, the spec parser and the grounding reporter

pub mod core;
pub mod plugins;

mod cli;

use cli::{Cli, Command, CommonOpts, GroundCli, OutputFormat, USAGE, VerifyCli};
use crate::core::config::GateConfig;
use crate::core::error::SpecgateError;
use crate::core::{output, trace};
use crate::plugins::contract::Contract;
use crate::plugins::ground::{self, GroundReport};
use crate::plugins::spec::SpecDocument;
use crate::plugins::verify::VerifyReport;
use crate::plugins::{legacy, verify};

use clap::Parser;
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::path::Path;

/// Parse arguments, run the requested command and return the process exit
/// code.
pub fn run() -> i32 {
    run_from(std::env::args_os())
}

/// Entry point for single-purpose binaries invoked as
/// `<bin> <input> <project_root>`: behaves like `specgate <command> ...`.
pub fn run_command(command: &str) -> i32 {
    let mut args = std::env::args_os();
    let bin = args.next().unwrap_or_else(|| OsString::from("specgate"));
    run_from([bin, OsString::from(command)].into_iter().chain(args))
}

fn run_from<I>(args: I) -> i32
where
    I: IntoIterator<Item = OsString>,
{
    trace::init();

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return 0;
        }
        Err(e) => {
            log::debug!("argument error: {:?}", e.kind());
            let err = SpecgateError::UsageError(USAGE.to_string());
            emit_error(&err);
            return err.exit_code();
        }
    };

    match dispatch(cli.command) {
        Ok(code) => code,
        Err(e) => {
            emit_error(&e);
            e.exit_code()
        }
    }
}

fn dispatch(command: Command) -> Result<i32, SpecgateError> {
    match command {
        Command::Verify(args) => run_verify(args, false),
        Command::VerifyLegacy(args) => run_verify(args, true),
        Command::Ground(args) => run_ground(args),
    }
}

fn emit_error(err: &SpecgateError) {
    println!("{}", serde_json::json!({ "error": err.to_string() }));
}

fn check_project_root(root: &Path) -> Result<(), SpecgateError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(SpecgateError::InputReadError(format!(
            "project root {} is not a directory",
            root.display()
        )))
    }
}

fn load_config(root: &Path, opts: &CommonOpts) -> Result<GateConfig, SpecgateError> {
    let config = GateConfig::load(root, opts.config.as_deref())?;
    log::debug!(
        "config: {} model dirs, {} migration dirs, token budget {}",
        config.model_dirs.len(),
        config.migration_dirs.len(),
        config.context_token_budget
    );
    Ok(config)
}

fn run_verify(args: VerifyCli, legacy_mode: bool) -> Result<i32, SpecgateError> {
    let contract = Contract::load(&args.contract)?;
    check_project_root(&args.project_root)?;

    let report = if legacy_mode {
        legacy::run_legacy_verify(&contract, &args.project_root)
    } else {
        let config = load_config(&args.project_root, &args.opts)?;
        verify::run_verify(&contract, &args.project_root, &config)?
    };

    match args.opts.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Text => print_verify_text(&report),
    }
    Ok(report.exit_code())
}

fn run_ground(args: GroundCli) -> Result<i32, SpecgateError> {
    let spec = SpecDocument::load(&args.spec)?;
    check_project_root(&args.project_root)?;
    let config = load_config(&args.project_root, &args.opts)?;

    let report = ground::run_ground(&spec, &args.project_root, &config);
    match args.opts.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Text => print_ground_text(&report),
    }
    Ok(0)
}

fn print_verify_text(report: &VerifyReport) {
    use colored::Colorize;

    for r in &report.results {
        let mark = if r.passed { "PASS".green().bold() } else { "FAIL".red().bold() };
        println!("{} {}", mark, r.check);
        if !r.passed {
            println!("     {}", output::compact_line(&r.detail, 160).dimmed());
        }
    }
    if let Some(stats) = &report.extraction {
        println!(
            "Extracted: {} model tables, {} migration tables ({})",
            stats.model_tables, stats.migration_tables, stats.model_digest
        );
        for f in &stats.skipped_files {
            println!("  skipped: {}", f.yellow());
        }
    }
    let verdict = if report.passed { "PASSED".green().bold() } else { "FAILED".red().bold() };
    println!(
        "{} total={} passed={} failed={}",
        verdict, report.summary.total, report.summary.passed, report.summary.failed
    );
}

fn print_ground_text(report: &GroundReport) {
    use crate::core::model::Severity;
    use colored::Colorize;

    for w in &report.warnings {
        let tag = match w.severity {
            Severity::Info => "info ".cyan(),
            Severity::Warn => "warn ".yellow().bold(),
            Severity::Error => "error".red().bold(),
        };
        println!("{} {}", tag, w.message);
    }
    let s = &report.stats;
    println!(
        "Summary: info={} warn={} error={} | context {}/{} tokens, {} files omitted",
        s.info,
        s.warn,
        s.error,
        s.context.used_tokens,
        s.context.budget_tokens,
        s.context.omitted_files.len()
    );
    println!();
    println!("{}", report.codebase_context);
}
