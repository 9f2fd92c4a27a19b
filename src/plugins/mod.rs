//! Extractors, verifiers and the grounding reporter.

pub mod context;
pub mod contract;
pub mod conventions;
pub mod ground;
pub mod legacy;
pub mod migrations;
pub mod models;
pub mod spec;
pub mod verify;
