//! Capture engine for sentinel-toggled memory access tracing.
//!
//! The engine watches translated instruction blocks for a fixed-byte sentinel
//! instruction. Each execution of the sentinel flips capture on or off; while capture
//! is on, every memory access that resolves to ordinary RAM has its physical address
//! appended to a trace file.
//!
//! ```ignore
//! use cachetrace_engine::{CaptureEngine, EngineConfig, Hook};
//!
//! let mut engine = CaptureEngine::create("trace.bin".as_ref(), EngineConfig::default())?;
//! for planned in engine.plan(&block) {
//!     // register `planned.hook` with the host for instruction `planned.index`
//! }
//! engine.fire(0, Hook::Toggle, None)?;
//! let summary = engine.finish()?;
//! ```

mod config;
mod engine;
mod host;
mod planner;
mod sentinel;
mod state;

pub use config::{ConfigError, HostInfo, PluginArgs, SUPPORTED_TARGET, install};
pub use engine::{CaptureEngine, CaptureSummary, EngineConfig, Outcome};
pub use host::{InstructionRecord, MemAccess, MemoryTransaction, Resolved, Transaction};
pub use planner::{Hook, PlannedHook, Planner};
pub use sentinel::{SentinelPattern, X86_64_MAGIC};
pub use state::CaptureState;

pub use cachetrace_format::{TraceError, TraceWriter};

use thiserror::Error;

/// Engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("trace error: {0}")]
    Trace(#[from] TraceError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
