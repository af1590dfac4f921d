//! Route `tracing` output to QEMU's plugin log.

use std::ffi::CString;
use std::io;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::sys;

/// Writer over `qemu_plugin_outs`.
pub struct QemuOuts;

impl io::Write for QemuOuts {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text: Vec<u8> = buf.iter().copied().filter(|&b| b != 0).collect();
        let line = CString::new(text).map_err(io::Error::other)?;
        unsafe { sys::qemu_plugin_outs(line.as_ptr()) };
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install the plugin's subscriber.
///
/// Everything goes to the QEMU log (`-d plugin`); warnings and errors are also
/// written to stderr so fatal startup problems are visible without it.
pub fn init_logging() {
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(|| QemuOuts);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // QEMU may load the plugin into a process that already has a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .try_init();
}
