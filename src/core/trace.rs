//! Env-gated diagnostics.
//!
//! stdout carries exactly one JSON document per run, so diagnostics go to
//! stderr and only when `SPECGATE_TRACE=1`.

use log::{LevelFilter, Log, Metadata, Record};

pub const TRACE_ENV: &str = "SPECGATE_TRACE";

struct StderrTrace;

static LOGGER: StderrTrace = StderrTrace;

impl Log for StderrTrace {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("specgate")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "specgate: {} {}",
                record.level().as_str().to_lowercase(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

pub fn trace_enabled() -> bool {
    std::env::var(TRACE_ENV).ok().as_deref() == Some("1")
}

/// Install the stderr logger if tracing is requested. Safe to call more
/// than once; later calls are no-ops.
pub fn init() {
    if !trace_enabled() {
        return;
    }
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}
