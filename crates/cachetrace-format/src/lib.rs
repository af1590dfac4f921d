//! Binary memory-trace file format.
//!
//! A trace is a sequence of little-endian 64-bit words:
//!
//! ```text
//! offset 0:      u64  total_recorded_count   (0 until finalized)
//! offset 8:      u64  physical_address[0]
//! offset 8+8k:   u64  physical_address[k]
//! ```
//!
//! The header is reserved as zero when the file is created and patched with the
//! final count on finalize. A file whose header is still zero but whose body is
//! non-empty comes from a run that never finalized; its record count is recovered
//! from the body size.

mod reader;
mod writer;

pub use reader::{TraceFile, TraceReader, TraceStatus};
pub use writer::TraceWriter;

use thiserror::Error;

/// Size of the header word in bytes.
pub const HEADER_SIZE: usize = 8;

/// Size of one address record in bytes.
pub const RECORD_SIZE: usize = 8;

/// Trace file errors.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace too short: {0} bytes, need at least {min}", min = HEADER_SIZE)]
    TooShort(usize),
    #[error("trace body is {0} bytes, not a multiple of {size}", size = RECORD_SIZE)]
    Misaligned(usize),
    #[error("header says {header} records but body holds {body}")]
    CountMismatch { header: u64, body: u64 },
    #[error("an earlier write failed; trace left unfinalized")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, TraceError>;
