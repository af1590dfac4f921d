//! Trace file writer.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, error, warn};

use crate::{Result, TraceError};

/// Append-only writer for a trace file.
///
/// Creating the writer reserves the zero header; [`TraceWriter::finalize`] patches it
/// with the final count. A writer dropped without being finalized (an error return or
/// a panic unwinding through its owner) finalizes itself with the number of records it
/// has appended, so the file stays self-consistent on every exit path that runs
/// destructors.
///
/// Once any write fails the writer is poisoned: the header is never patched again,
/// so a truncated trace keeps its zero header and reads as incomplete.
pub struct TraceWriter<W: Write + Seek = BufWriter<File>> {
    inner: Option<W>,
    records: u64,
    poisoned: bool,
}

impl TraceWriter {
    /// Create or truncate the trace file at `path` and reserve its header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        debug!(path = %path.display(), "created trace file");
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> TraceWriter<W> {
    /// Wrap a sink positioned at its start and write the header placeholder.
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(&0u64.to_le_bytes())?;
        // The placeholder must reach the file even if the process never exits cleanly.
        inner.flush()?;
        Ok(Self {
            inner: Some(inner),
            records: 0,
            poisoned: false,
        })
    }

    /// Append one physical address record.
    pub fn append(&mut self, addr: u64) -> Result<()> {
        if self.poisoned {
            return Err(TraceError::Poisoned);
        }
        if let Err(e) = self.sink()?.write_all(&addr.to_le_bytes()) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.records += 1;
        Ok(())
    }

    /// Number of records appended so far.
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Whether a write has failed.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Patch the header with `count`, flush, and hand back the sink.
    ///
    /// Dropping the returned sink closes the file. Fails without touching the header
    /// if the writer is poisoned.
    pub fn finalize(mut self, count: u64) -> Result<W> {
        if self.poisoned {
            return Err(TraceError::Poisoned);
        }
        if count != self.records {
            warn!(count, records = self.records, "finalizing with a count that differs from the body");
        }
        let mut inner = self.take_sink()?;
        patch_header(&mut inner, count)?;
        debug!(count, "finalized trace");
        Ok(inner)
    }

    fn sink(&mut self) -> io::Result<&mut W> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("trace writer already finalized"))
    }

    fn take_sink(&mut self) -> io::Result<W> {
        self.inner
            .take()
            .ok_or_else(|| io::Error::other("trace writer already finalized"))
    }
}

impl<W: Write + Seek> Drop for TraceWriter<W> {
    fn drop(&mut self) {
        let records = self.records;
        let Some(mut inner) = self.inner.take() else {
            return;
        };
        if self.poisoned {
            error!(records, "trace write failed; header left at zero");
            return;
        }
        match patch_header(&mut inner, records) {
            Ok(()) => debug!(records, "finalized trace on drop"),
            Err(e) => warn!(error = %e, records, "failed to finalize trace on drop"),
        }
    }
}

/// Overwrite the header word and leave the cursor at end of file.
fn patch_header<W: Write + Seek>(inner: &mut W, count: u64) -> io::Result<()> {
    inner.flush()?;
    inner.seek(SeekFrom::Start(0))?;
    inner.write_all(&count.to_le_bytes())?;
    inner.seek(SeekFrom::End(0))?;
    inner.flush()
}
