//! Trace summaries for inspection.

use std::collections::BTreeSet;
use std::io::Read;

use crate::{TraceError, TraceReader, TraceStatus};

/// Figures describing one trace file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSummary {
    pub status: TraceStatus,
    pub header_count: u64,
    pub records: u64,
    pub distinct: usize,
    pub min_addr: Option<u64>,
    pub max_addr: Option<u64>,
    pub trailing_bytes: usize,
}

impl TraceSummary {
    /// Consume a trace reader, validating the whole body.
    pub fn scan<R: Read>(mut reader: TraceReader<R>) -> Result<Self, TraceError> {
        let mut distinct = BTreeSet::new();
        while let Some(addr) = reader.next_address()? {
            distinct.insert(addr);
        }
        Ok(Self {
            status: reader.status(),
            header_count: reader.header_count(),
            records: reader.records_read(),
            distinct: distinct.len(),
            min_addr: distinct.first().copied(),
            max_addr: distinct.last().copied(),
            trailing_bytes: reader.trailing_bytes(),
        })
    }

    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        match self.status {
            TraceStatus::Complete { .. } => "complete",
            TraceStatus::Incomplete { .. } => "incomplete",
            TraceStatus::Empty => "empty",
        }
    }
}
