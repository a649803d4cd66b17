//! Error taxonomy shared by the sampling core.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid option combinations, detected before sampling starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("process-set monitoring requires at least one pid or keyword root")]
    MissingSelectors,

    #[error("sampling delay must be a positive number of seconds, got {0}")]
    InvalidDelay(f64),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failures reported by the OS-introspection layer.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The process exited between enumeration and read.
    #[error("process {0} vanished before it could be read")]
    Vanished(u32),

    #[error("failed to enumerate processes: {0}")]
    Enumeration(String),
}

/// A fault that ends the owning monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("failed to write record: {0}")]
    Emit(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{name} monitor failed: {source}")]
    Collector {
        name: &'static str,
        #[source]
        source: MonitorError,
    },

    #[error("every registered monitor has been disabled after a fault")]
    AllCollectorsFailed,
}
