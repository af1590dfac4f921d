//! Trace file reader.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::{HEADER_SIZE, RECORD_SIZE, Result, TraceError};

/// Completion state of a trace file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStatus {
    /// Finalized; the header matches the body.
    Complete { count: u64 },
    /// Never finalized; the count is recovered from the body size.
    Incomplete { recovered: u64 },
    /// Zero header and empty body.
    Empty,
}

impl TraceStatus {
    const fn of(header: u64, records: u64) -> Self {
        match (header, records) {
            (0, 0) => Self::Empty,
            (0, n) => Self::Incomplete { recovered: n },
            (count, _) => Self::Complete { count },
        }
    }

    /// Number of records the trace holds.
    #[must_use]
    pub const fn count(self) -> u64 {
        match self {
            Self::Complete { count } => count,
            Self::Incomplete { recovered } => recovered,
            Self::Empty => 0,
        }
    }
}

/// Streaming reader yielding one address per 8-byte record.
///
/// Memory use is independent of the trace size. The body is validated as it is
/// consumed: a partial record in a finalized trace is `Misaligned`, and a finalized
/// header that disagrees with the body is reported as `CountMismatch` at end of input.
/// An unfinalized trace (zero header) may end in a partial record, which is skipped.
pub struct TraceReader<R: Read = BufReader<File>> {
    inner: R,
    header: u64,
    records: u64,
    trailing: usize,
    done: bool,
}

impl TraceReader {
    /// Open a trace on disk and read its header.
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> TraceReader<R> {
    /// Read the header from a source positioned at the start of a trace.
    pub fn new(mut inner: R) -> Result<Self> {
        let mut word = [0u8; HEADER_SIZE];
        let n = read_up_to(&mut inner, &mut word)?;
        if n < HEADER_SIZE {
            return Err(TraceError::TooShort(n));
        }
        Ok(Self {
            inner,
            header: u64::from_le_bytes(word),
            records: 0,
            trailing: 0,
            done: false,
        })
    }

    /// Raw header word.
    #[must_use]
    pub const fn header_count(&self) -> u64 {
        self.header
    }

    /// Complete records read so far.
    #[must_use]
    pub const fn records_read(&self) -> u64 {
        self.records
    }

    /// Bytes of a partial final record; known once the body is exhausted.
    #[must_use]
    pub const fn trailing_bytes(&self) -> usize {
        self.trailing
    }

    /// Completion state; final once the body is exhausted.
    #[must_use]
    pub const fn status(&self) -> TraceStatus {
        TraceStatus::of(self.header, self.records)
    }

    /// Next recorded address, or `None` at end of body.
    pub fn next_address(&mut self) -> Result<Option<u64>> {
        if self.done {
            return Ok(None);
        }
        let mut word = [0u8; RECORD_SIZE];
        let n = read_up_to(&mut self.inner, &mut word)?;
        if n == RECORD_SIZE {
            self.records += 1;
            return Ok(Some(u64::from_le_bytes(word)));
        }

        self.done = true;
        if n > 0 {
            if self.header != 0 {
                let body = usize::try_from(self.records).unwrap_or(usize::MAX);
                return Err(TraceError::Misaligned(
                    body.saturating_mul(RECORD_SIZE).saturating_add(n),
                ));
            }
            self.trailing = n;
        }
        if self.header != 0 && self.header != self.records {
            return Err(TraceError::CountMismatch {
                header: self.header,
                body: self.records,
            });
        }
        Ok(None)
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_address() {
            Ok(addr) => addr.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// A fully loaded trace file.
#[derive(Debug, Clone)]
pub struct TraceFile {
    header: u64,
    addresses: Vec<u64>,
    trailing: usize,
}

impl TraceFile {
    /// Read and parse a trace from disk.
    pub fn open(path: &Path) -> Result<Self> {
        Self::load(TraceReader::open(path)?)
    }

    /// Parse a trace from its raw bytes.
    ///
    /// A finalized trace must have a body of exactly `header` records. An unfinalized
    /// trace (zero header) may end in a partially written record, which is ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::load(TraceReader::new(data)?)
    }

    /// Drain a reader into memory.
    pub fn load<R: Read>(mut reader: TraceReader<R>) -> Result<Self> {
        let mut addresses = Vec::new();
        while let Some(addr) = reader.next_address()? {
            addresses.push(addr);
        }
        Ok(Self {
            header: reader.header_count(),
            addresses,
            trailing: reader.trailing_bytes(),
        })
    }

    /// Raw header word.
    #[must_use]
    pub const fn header_count(&self) -> u64 {
        self.header
    }

    /// Number of complete records in the body.
    #[must_use]
    pub fn body_records(&self) -> u64 {
        self.addresses.len() as u64
    }

    /// Bytes of a partial record at the end of an unfinalized trace.
    #[must_use]
    pub const fn trailing_bytes(&self) -> usize {
        self.trailing
    }

    #[must_use]
    pub fn status(&self) -> TraceStatus {
        TraceStatus::of(self.header, self.body_records())
    }

    /// Recorded physical addresses in execution order.
    #[must_use]
    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.addresses.iter().copied()
    }
}

/// Fill `buf` as far as the source allows; returns the bytes read.
fn read_up_to<R: Read>(inner: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(words: &[u64]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Source that hands out at most three bytes per read.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.0.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_complete_trace() {
        let trace = TraceFile::from_bytes(&encode(&[3, 0xa, 0xb, 0xc])).unwrap();
        assert_eq!(trace.status(), TraceStatus::Complete { count: 3 });
        assert_eq!(trace.addresses(), &[0xa, 0xb, 0xc]);
    }

    #[test]
    fn test_header_only_is_empty() {
        let trace = TraceFile::from_bytes(&encode(&[0])).unwrap();
        assert_eq!(trace.status(), TraceStatus::Empty);
        assert_eq!(trace.status().count(), 0);
    }

    #[test]
    fn test_unfinalized_trace_recovers_count() {
        let trace = TraceFile::from_bytes(&encode(&[0, 0x100, 0x200])).unwrap();
        assert_eq!(trace.status(), TraceStatus::Incomplete { recovered: 2 });
        assert_eq!(trace.header_count(), 0);
    }

    #[test]
    fn test_unfinalized_trace_ignores_partial_record() {
        let mut bytes = encode(&[0, 0x100]);
        bytes.extend_from_slice(&[1, 2, 3]);
        let trace = TraceFile::from_bytes(&bytes).unwrap();
        assert_eq!(trace.status().count(), 1);
        assert_eq!(trace.trailing_bytes(), 3);
    }

    #[test]
    fn test_rejects_short_file() {
        assert!(matches!(
            TraceFile::from_bytes(&[0; 5]),
            Err(TraceError::TooShort(5))
        ));
    }

    #[test]
    fn test_rejects_misaligned_finalized_body() {
        let mut bytes = encode(&[1, 0x100]);
        bytes.push(0);
        assert!(matches!(
            TraceFile::from_bytes(&bytes),
            Err(TraceError::Misaligned(9))
        ));
    }

    #[test]
    fn test_rejects_count_mismatch() {
        assert!(matches!(
            TraceFile::from_bytes(&encode(&[5, 0x100])),
            Err(TraceError::CountMismatch { header: 5, body: 1 })
        ));
    }

    #[test]
    fn test_streams_short_reads() {
        let bytes = encode(&[2, 0xdead_beef, 0x40]);
        let reader = TraceReader::new(Trickle(&bytes)).unwrap();
        assert_eq!(reader.header_count(), 2);
        let addrs: Vec<u64> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(addrs, vec![0xdead_beef, 0x40]);
    }

    #[test]
    fn test_stream_status_after_exhaustion() {
        let mut bytes = encode(&[0, 0x10, 0x20]);
        bytes.extend_from_slice(&[9, 9]);
        let mut reader = TraceReader::new(bytes.as_slice()).unwrap();
        assert_eq!(reader.next_address().unwrap(), Some(0x10));
        assert_eq!(reader.next_address().unwrap(), Some(0x20));
        assert_eq!(reader.next_address().unwrap(), None);
        assert_eq!(reader.next_address().unwrap(), None);
        assert_eq!(reader.records_read(), 2);
        assert_eq!(reader.status(), TraceStatus::Incomplete { recovered: 2 });
        assert_eq!(reader.trailing_bytes(), 2);
    }

    #[test]
    fn test_stream_stops_after_error() {
        let bytes = encode(&[3, 0x10]);
        let mut reader = TraceReader::new(bytes.as_slice()).unwrap().map(|r| r.ok());
        assert_eq!(reader.next(), Some(Some(0x10)));
        assert_eq!(reader.next(), Some(None));
        assert_eq!(reader.next(), None);
    }

    #[test]
    fn test_open_streams_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.bin");
        std::fs::write(&path, encode(&[2, 0x1000, 0x2000])).unwrap();
        let reader = TraceReader::open(&path).unwrap();
        let addrs: Result<Vec<u64>> = reader.collect();
        assert_eq!(addrs.unwrap(), vec![0x1000, 0x2000]);
    }

    #[test]
    fn test_error_messages_name_sizes() {
        assert_eq!(
            TraceError::TooShort(5).to_string(),
            "trace too short: 5 bytes, need at least 8"
        );
        assert_eq!(
            TraceError::Misaligned(9).to_string(),
            "trace body is 9 bytes, not a multiple of 8"
        );
    }
}
