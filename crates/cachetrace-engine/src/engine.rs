//! Capture engine: executes hooks against the capture state and trace writer.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use cachetrace_format::TraceWriter;
use tracing::info;

use crate::Result;
use crate::host::{InstructionRecord, MemAccess, MemoryTransaction, Resolved};
use crate::planner::{Hook, PlannedHook, Planner};
use crate::sentinel::SentinelPattern;
use crate::state::CaptureState;

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Instruction encoding that toggles capture.
    pub sentinel: SentinelPattern,
    /// Access kinds record hooks fire on.
    pub access: MemAccess,
}

/// Result of executing one hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Sentinel executed; capture is now in the given state.
    Toggled { active: bool },
    /// Address appended to the trace.
    Recorded(u64),
    /// Capture is off.
    Inactive,
    /// Access targets an I/O region.
    SkippedIo,
    /// Access could not be resolved to a physical address.
    Unresolved,
}

/// Final figures reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub recorded: u64,
    pub toggles: u64,
    pub skipped_io: u64,
    pub skipped_unresolved: u64,
    pub active_at_exit: bool,
}

impl fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} transactions captured ({} sentinel executions, {} I/O and {} unresolved accesses skipped)",
            self.recorded, self.toggles, self.skipped_io, self.skipped_unresolved
        )
    }
}

/// Sentinel-toggled capture engine for a single vCPU.
pub struct CaptureEngine<W: Write + Seek = BufWriter<File>> {
    planner: Planner,
    state: CaptureState,
    trace: TraceWriter<W>,
    toggles: u64,
    skipped_io: u64,
    skipped_unresolved: u64,
}

impl CaptureEngine {
    /// Create the trace file at `path` and an engine writing to it.
    pub fn create(path: &Path, config: EngineConfig) -> Result<Self> {
        let trace = TraceWriter::create(path)?;
        Ok(Self::new(trace, config))
    }
}

impl<W: Write + Seek> CaptureEngine<W> {
    #[must_use]
    pub fn new(trace: TraceWriter<W>, config: EngineConfig) -> Self {
        Self {
            planner: Planner::new(config.sentinel, config.access),
            state: CaptureState::new(),
            trace,
            toggles: 0,
            skipped_io: 0,
            skipped_unresolved: 0,
        }
    }

    #[must_use]
    pub const fn planner(&self) -> &Planner {
        &self.planner
    }

    #[must_use]
    pub const fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Plan hooks for a newly translated block.
    #[must_use]
    pub fn plan(&self, block: &[InstructionRecord<'_>]) -> Vec<PlannedHook> {
        self.planner.plan(block)
    }

    /// Run the behavior of `hook` for one execution of its instruction.
    ///
    /// Record hooks carry the access that triggered them; a record hook fired without
    /// one is treated as unresolvable.
    pub fn fire(
        &mut self,
        vcpu: u32,
        hook: Hook,
        access: Option<&dyn MemoryTransaction>,
    ) -> Result<Outcome> {
        match hook {
            Hook::Toggle => Ok(Outcome::Toggled {
                active: self.toggle(vcpu),
            }),
            Hook::Record(_) => match access {
                Some(txn) => self.record(txn),
                None if self.state.is_active() => {
                    self.skipped_unresolved += 1;
                    Ok(Outcome::Unresolved)
                }
                None => Ok(Outcome::Inactive),
            },
        }
    }

    /// Sentinel executed: flip capture and report it.
    pub fn toggle(&mut self, vcpu: u32) -> bool {
        self.toggles += 1;
        let active = self.state.toggle();
        info!(vcpu, "sentinel instruction executed");
        if active {
            info!("capture started");
        } else {
            info!(
                transactions = self.state.snapshot_count(),
                "capture stopped"
            );
        }
        active
    }

    /// Memory access executed: append its physical address if capturing.
    pub fn record<T: MemoryTransaction + ?Sized>(&mut self, txn: &T) -> Result<Outcome> {
        if !self.state.is_active() {
            return Ok(Outcome::Inactive);
        }
        match txn.resolve() {
            Some(Resolved::Ram(paddr)) => {
                self.trace.append(paddr)?;
                self.state.record_one();
                Ok(Outcome::Recorded(paddr))
            }
            Some(Resolved::Io) => {
                self.skipped_io += 1;
                Ok(Outcome::SkippedIo)
            }
            None => {
                self.skipped_unresolved += 1;
                Ok(Outcome::Unresolved)
            }
        }
    }

    #[must_use]
    pub const fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            recorded: self.state.snapshot_count(),
            toggles: self.toggles,
            skipped_io: self.skipped_io,
            skipped_unresolved: self.skipped_unresolved,
            active_at_exit: self.state.is_active(),
        }
    }

    /// Write the final count into the trace header and close it.
    pub fn finish(self) -> Result<CaptureSummary> {
        self.finish_into().map(|(summary, _)| summary)
    }

    /// Like [`CaptureEngine::finish`], also returning the finalized sink.
    pub fn finish_into(self) -> Result<(CaptureSummary, W)> {
        let summary = self.summary();
        let sink = self.trace.finalize(summary.recorded)?;
        Ok((summary, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use crate::host::Transaction;
    use cachetrace_format::{TraceError, TraceFile, TraceStatus};
    use std::cell::RefCell;
    use std::io::{self, Cursor, SeekFrom};
    use std::rc::Rc;

    /// Sink that accepts `capacity` bytes and then reports a full disk.
    struct FullDisk(Rc<RefCell<Cursor<Vec<u8>>>>, u64);

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut data = self.0.borrow_mut();
            if data.position() + buf.len() as u64 > self.1 {
                return Err(io::Error::other("disk full"));
            }
            data.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FullDisk {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.0.borrow_mut().seek(pos)
        }
    }

    fn engine() -> CaptureEngine<Cursor<Vec<u8>>> {
        let trace = TraceWriter::new(Cursor::new(Vec::new())).unwrap();
        CaptureEngine::new(trace, EngineConfig::default())
    }

    fn words(bytes: &[u8]) -> Vec<u64> {
        bytes
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    const RECORD: Hook = Hook::Record(MemAccess::ReadWrite);

    #[test]
    fn test_capture_window() {
        let mut engine = engine();
        assert_eq!(
            engine.fire(0, Hook::Toggle, None).unwrap(),
            Outcome::Toggled { active: true }
        );
        for addr in [0xa000, 0xb000, 0xc000] {
            let txn = Transaction::ram(addr + 0xffff_0000, addr);
            assert_eq!(
                engine.fire(0, RECORD, Some(&txn)).unwrap(),
                Outcome::Recorded(addr)
            );
        }
        assert_eq!(
            engine.fire(0, Hook::Toggle, None).unwrap(),
            Outcome::Toggled { active: false }
        );

        let (summary, sink) = engine.finish_into().unwrap();
        assert_eq!(summary.recorded, 3);
        assert_eq!(summary.toggles, 2);
        assert!(!summary.active_at_exit);
        assert_eq!(words(&sink.into_inner()), vec![3, 0xa000, 0xb000, 0xc000]);
    }

    #[test]
    fn test_inactive_accesses_are_dropped() {
        let mut engine = engine();
        let txn = Transaction::ram(0x10, 0x10);
        assert_eq!(engine.record(&txn).unwrap(), Outcome::Inactive);
        assert_eq!(engine.record(&txn).unwrap(), Outcome::Inactive);
        assert_eq!(engine.state().snapshot_count(), 0);

        let (summary, sink) = engine.finish_into().unwrap();
        assert_eq!(summary.recorded, 0);
        assert_eq!(words(&sink.into_inner()), vec![0]);
    }

    #[test]
    fn test_io_never_recorded() {
        let mut engine = engine();
        assert_eq!(engine.record(&Transaction::io(0x1)).unwrap(), Outcome::Inactive);
        engine.toggle(0);
        assert_eq!(engine.record(&Transaction::io(0x1)).unwrap(), Outcome::SkippedIo);
        assert_eq!(engine.state().snapshot_count(), 0);
        assert_eq!(engine.summary().skipped_io, 1);
    }

    #[test]
    fn test_unresolved_skipped() {
        let mut engine = engine();
        engine.toggle(0);
        assert_eq!(
            engine.record(&Transaction::unresolved(0x2)).unwrap(),
            Outcome::Unresolved
        );
        assert_eq!(engine.fire(0, RECORD, None).unwrap(), Outcome::Unresolved);
        let summary = engine.summary();
        assert_eq!(summary.skipped_unresolved, 2);
        assert_eq!(summary.recorded, 0);
    }

    #[test]
    fn test_back_to_back_sentinels() {
        let mut engine = engine();
        engine.toggle(0);
        engine.toggle(0);
        assert!(!engine.state().is_active());
        let (summary, sink) = engine.finish_into().unwrap();
        assert_eq!(summary.recorded, 0);
        assert_eq!(words(&sink.into_inner()), vec![0]);
    }

    #[test]
    fn test_active_at_exit_still_finalizes() {
        let mut engine = engine();
        engine.toggle(0);
        engine.record(&Transaction::ram(0, 0x40)).unwrap();
        let (summary, sink) = engine.finish_into().unwrap();
        assert!(summary.active_at_exit);
        assert_eq!(words(&sink.into_inner()), vec![1, 0x40]);
    }

    #[test]
    fn test_summary_display() {
        let summary = CaptureSummary {
            recorded: 3,
            toggles: 2,
            skipped_io: 1,
            skipped_unresolved: 0,
            active_at_exit: false,
        };
        assert_eq!(
            summary.to_string(),
            "3 transactions captured (2 sentinel executions, 1 I/O and 0 unresolved accesses skipped)"
        );
    }

    #[test]
    fn test_write_failure_leaves_trace_incomplete() {
        let data = Rc::new(RefCell::new(Cursor::new(Vec::new())));
        let trace = TraceWriter::new(FullDisk(Rc::clone(&data), 16)).unwrap();
        let mut engine = CaptureEngine::new(trace, EngineConfig::default());
        engine.toggle(0);

        engine.record(&Transaction::ram(0, 0xa0)).unwrap();
        assert!(matches!(
            engine.record(&Transaction::ram(0, 0xb0)),
            Err(EngineError::Trace(TraceError::Io(_)))
        ));
        assert_eq!(engine.state().snapshot_count(), 1);
        drop(engine);

        let trace = TraceFile::from_bytes(data.borrow().get_ref()).unwrap();
        assert_eq!(trace.header_count(), 0);
        assert_eq!(trace.status(), TraceStatus::Incomplete { recovered: 1 });
    }

    #[test]
    fn test_finish_after_write_failure_is_an_error() {
        let data = Rc::new(RefCell::new(Cursor::new(Vec::new())));
        let trace = TraceWriter::new(FullDisk(Rc::clone(&data), 8)).unwrap();
        let mut engine = CaptureEngine::new(trace, EngineConfig::default());
        engine.toggle(0);
        assert!(engine.record(&Transaction::ram(0, 0x40)).is_err());
        assert!(matches!(
            engine.finish(),
            Err(EngineError::Trace(TraceError::Poisoned))
        ));
        assert_eq!(words(data.borrow().get_ref()), vec![0]);
    }
}
