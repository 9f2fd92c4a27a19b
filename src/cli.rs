//! CLI struct definitions for the specgate command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "specgate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Checks declared data-model contracts and specs against a Python codebase without running it."
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(clap::Args, Debug)]
pub(crate) struct CommonOpts {
    /// TOML config file (default: <project_root>/specgate.toml when present).
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Output format: 'json' or 'text'.
    #[clap(long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub(crate) struct VerifyCli {
    /// Contract JSON file.
    pub contract: PathBuf,
    /// Root of the project to inspect.
    pub project_root: PathBuf,
    #[clap(flatten)]
    pub opts: CommonOpts,
}

#[derive(clap::Args, Debug)]
pub(crate) struct GroundCli {
    /// Markdown spec file.
    pub spec: PathBuf,
    /// Root of the project to inspect.
    pub project_root: PathBuf,
    #[clap(flatten)]
    pub opts: CommonOpts,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Verify a contract against extracted models and migrations (exit 1 on failure)
    Verify(VerifyCli),
    /// Check file, function and database entities exist without parsing source
    VerifyLegacy(VerifyCli),
    /// Ground a Markdown spec against the codebase (advisory, always exit 0)
    Ground(GroundCli),
}

pub(crate) const USAGE: &str = "specgate <verify|verify-legacy> <contract.json> <project_root> | specgate ground <spec.md> <project_root> [--config <file>] [--format json|text]";
