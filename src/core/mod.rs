//! Shared foundations: Python parsing, directory walking, configuration,
//! errors, tracing and the extracted-model types.

pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod python;
pub mod repomap;
pub mod trace;
pub mod walk;
