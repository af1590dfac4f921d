//! Dump command.

use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tracing::error;

use cachetrace::TraceReader;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

/// Handle the `dump` command.
pub fn cmd_dump(input: &Path, limit: Option<usize>) -> i32 {
    let reader = match TraceReader::open(input) {
        Ok(reader) => reader,
        Err(e) => {
            error!(error = %e, path = %input.display(), "failed to read trace");
            return EXIT_FAILURE;
        }
    };

    let stdout = io::stdout();
    match write_addresses(&mut BufWriter::new(stdout.lock()), reader, limit) {
        Ok(()) => EXIT_SUCCESS,
        // Closed pipe (e.g. `| head`) is not an error.
        Err(cachetrace::Error::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => EXIT_SUCCESS,
        Err(e) => {
            error!(error = %e, path = %input.display(), "failed to dump trace");
            EXIT_FAILURE
        }
    }
}

/// Stream addresses from `reader` to `out`, one record at a time.
fn write_addresses<R: Read>(
    out: &mut impl Write,
    reader: TraceReader<R>,
    limit: Option<usize>,
) -> cachetrace::Result<()> {
    for addr in reader.take(limit.unwrap_or(usize::MAX)) {
        writeln!(out, "{:#018x}", addr?)?;
    }
    out.flush()?;
    Ok(())
}
