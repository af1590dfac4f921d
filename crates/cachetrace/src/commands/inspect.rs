//! Inspect command.

use std::io::{self, Write};
use std::path::Path;

use console::style;
use tracing::{error, warn};

use cachetrace::{TraceStatus, TraceSummary};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS, OutputFormat};

/// Handle the `inspect` command.
pub fn cmd_inspect(input: &Path, format: OutputFormat) -> i32 {
    let summary = match cachetrace::inspect(input) {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, path = %input.display(), "failed to read trace");
            return EXIT_FAILURE;
        }
    };

    if let TraceStatus::Incomplete { recovered } = summary.status {
        warn!(
            recovered,
            path = %input.display(),
            "trace was never finalized; count recovered from file size"
        );
    }

    match write_summary(&mut io::stdout().lock(), format, &summary) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => EXIT_SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to write summary");
            EXIT_FAILURE
        }
    }
}

fn write_summary(
    out: &mut impl Write,
    format: OutputFormat,
    summary: &TraceSummary,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            let label = summary.status_label();
            let status = match summary.status {
                TraceStatus::Complete { .. } => style(label).green().bold(),
                TraceStatus::Incomplete { .. } => style(label).yellow().bold(),
                TraceStatus::Empty => style(label).dim(),
            };
            writeln!(out, "Status: {status}")?;
            writeln!(out, "Header count: {}", summary.header_count)?;
            writeln!(out, "Records: {}", summary.status.count())?;
            writeln!(out, "Distinct addresses: {}", summary.distinct)?;
            if let (Some(min), Some(max)) = (summary.min_addr, summary.max_addr) {
                writeln!(out, "Address range: {min:#018x}..={max:#018x}")?;
            }
            if summary.trailing_bytes > 0 {
                writeln!(out, "Trailing bytes: {}", summary.trailing_bytes)?;
            }
        }
        OutputFormat::Raw => {
            writeln!(out, "status: {}", summary.status_label())?;
            writeln!(out, "header: {}", summary.header_count)?;
            writeln!(out, "records: {}", summary.status.count())?;
            writeln!(out, "distinct: {}", summary.distinct)?;
            writeln!(out, "min: {}", raw_addr(summary.min_addr))?;
            writeln!(out, "max: {}", raw_addr(summary.max_addr))?;
        }
    }
    Ok(())
}

fn raw_addr(addr: Option<u64>) -> String {
    addr.map_or_else(|| "none".to_string(), |a| format!("{a:#x}"))
}
