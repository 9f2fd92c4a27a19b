use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecgateError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Usage: {0}")]
    UsageError(String),
    #[error("Cannot read input: {0}")]
    InputReadError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl SpecgateError {
    /// Process exit code for a fatal error. Check failures never reach here;
    /// they are report data, not errors.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Why a single source file contributed nothing to an extraction.
///
/// Always swallowed at the call site: the target tree may hold drafts,
/// generated code, or files in other languages.
#[derive(Error, Debug)]
pub enum SourceParseError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("syntax errors in {0}")]
    Syntax(PathBuf),
    #[error("parser unavailable: {0}")]
    Grammar(String),
}
