//! cachetrace - sentinel-toggled physical memory access tracer
//!
//! Records the physical addresses of memory accesses made between two executions of
//! a sentinel instruction, for offline cache studies.
//!
//! # Example
//!
//! ```ignore
//! use cachetrace::{CaptureEngine, EngineConfig, Hook, Transaction};
//!
//! let mut engine = CaptureEngine::create(path, EngineConfig::default())?;
//! engine.fire(0, Hook::Toggle, None)?;
//! engine.record(&Transaction::ram(vaddr, paddr))?;
//! let summary = engine.finish()?;
//! ```

// Re-export from sub-crates
pub use cachetrace_engine::{
    CaptureEngine, CaptureState, CaptureSummary, ConfigError, EngineConfig, EngineError, Hook,
    HostInfo, InstructionRecord, MemAccess, MemoryTransaction, Outcome, PlannedHook, Planner,
    PluginArgs, Resolved, SUPPORTED_TARGET, SentinelPattern, Transaction, X86_64_MAGIC, install,
};
pub use cachetrace_format::{
    HEADER_SIZE, RECORD_SIZE, TraceError, TraceFile, TraceReader, TraceStatus, TraceWriter,
};

mod summary;
pub use summary::TraceSummary;

use thiserror::Error;

/// Top-level errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("trace error: {0}")]
    Trace(#[from] TraceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Summarize a trace file in one streaming pass.
pub fn inspect(path: &std::path::Path) -> Result<TraceSummary> {
    Ok(TraceSummary::scan(TraceReader::open(path)?)?)
}
