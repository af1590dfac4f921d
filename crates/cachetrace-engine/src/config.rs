//! Startup configuration: plugin options and host checks.

use std::path::{Path, PathBuf};

use cachetrace_format::TraceError;
use thiserror::Error;
use tracing::info;

use crate::Result;
use crate::engine::{CaptureEngine, EngineConfig};

/// Only instruction-set target the engine supports.
pub const SUPPORTED_TARGET: &str = "x86_64";

/// Fatal startup errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required option: dump")]
    MissingDump,
    #[error("option given more than once: dump")]
    DuplicateDump,
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("malformed option (expected key=value): {0}")]
    MalformedOption(String),
    #[error("dump path is empty")]
    EmptyDumpPath,
    #[error("this plugin is for system emulation only")]
    UserModeEmulation,
    #[error("this plugin is for single-CPU emulation only (max vCPUs: {0})")]
    TooManyVcpus(u32),
    #[error("host reports no vCPUs")]
    ZeroVcpus,
    #[error("unsupported target: {0} (this plugin is for {target} only)", target = SUPPORTED_TARGET)]
    UnsupportedTarget(String),
    #[error("failed to open dump file {}: {}", .path.display(), .source)]
    OpenTrace {
        path: PathBuf,
        #[source]
        source: TraceError,
    },
}

/// Parsed plugin options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginArgs {
    /// Output trace path (`dump=<path>`).
    pub dump: PathBuf,
}

impl PluginArgs {
    /// Parse `key=value` plugin arguments. `dump` is the only recognized key and must
    /// appear exactly once.
    pub fn parse<I, S>(args: I) -> std::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dump = None;
        for arg in args {
            let arg = arg.as_ref();
            let Some((key, value)) = arg.split_once('=') else {
                return Err(ConfigError::MalformedOption(arg.to_string()));
            };
            match key {
                "dump" => {
                    if dump.is_some() {
                        return Err(ConfigError::DuplicateDump);
                    }
                    if value.is_empty() {
                        return Err(ConfigError::EmptyDumpPath);
                    }
                    dump = Some(PathBuf::from(value));
                }
                _ => return Err(ConfigError::UnknownOption(arg.to_string())),
            }
        }
        dump.map(|dump| Self { dump }).ok_or(ConfigError::MissingDump)
    }
}

/// Facts reported by the host emulator at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub target_name: String,
    pub system_emulation: bool,
    pub max_vcpus: u32,
}

impl HostInfo {
    /// Reject user-mode emulation, anything but exactly one vCPU, and foreign targets.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.system_emulation {
            return Err(ConfigError::UserModeEmulation);
        }
        match self.max_vcpus {
            0 => return Err(ConfigError::ZeroVcpus),
            1 => {}
            n => return Err(ConfigError::TooManyVcpus(n)),
        }
        if self.target_name != SUPPORTED_TARGET {
            return Err(ConfigError::UnsupportedTarget(self.target_name.clone()));
        }
        Ok(())
    }
}

/// Validate the startup configuration and open the trace.
///
/// Nothing is created on disk unless every check passes.
pub fn install<I, S>(args: I, host: &HostInfo, config: EngineConfig) -> Result<CaptureEngine>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args = PluginArgs::parse(args)?;
    host.validate()?;
    let engine = open_trace(&args.dump, config)?;
    info!(path = %args.dump.display(), "initialized cache trace plugin");
    Ok(engine)
}

fn open_trace(path: &Path, config: EngineConfig) -> std::result::Result<CaptureEngine, ConfigError> {
    let trace = cachetrace_format::TraceWriter::create(path).map_err(|source| {
        ConfigError::OpenTrace {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(CaptureEngine::new(trace, config))
}
