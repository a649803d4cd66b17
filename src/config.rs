use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::emit::Destination;
use crate::error::ConfigError;
use crate::monitor::RootSelectors;
use crate::schedule::FailurePolicy;

const NIC_PLACEHOLDER: &str = "{nic}";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub system: SystemConfig,
    pub nic: NicConfig,
    pub process_set: ProcessSetConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub delay_secs: f64,
    pub flush: bool,
    pub on_collector_error: FailurePolicy,
    /// Stop after this many ticks; unset runs until interrupted.
    pub count: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            delay_secs: 1.0,
            flush: false,
            on_collector_error: FailurePolicy::FailFast,
            count: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Unset writes to stdout.
    pub outfile: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NicConfig {
    pub interfaces: Vec<String>,
    pub outfile_pattern: String,
}

impl Default for NicConfig {
    fn default() -> Self {
        NicConfig {
            interfaces: Vec::new(),
            outfile_pattern: "netstat.{nic}.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProcessSetConfig {
    pub enabled: bool,
    pub pids: Vec<u32>,
    pub keywords: Vec<String>,
    pub outfile: PathBuf,
}

impl Default for ProcessSetConfig {
    fn default() -> Self {
        ProcessSetConfig {
            enabled: false,
            pids: Vec::new(),
            keywords: Vec::new(),
            outfile: PathBuf::from("psstat.csv"),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let delay = self.general.delay_secs;
        if !delay.is_finite() || delay <= 0.0 {
            return Err(ConfigError::InvalidDelay(delay));
        }
        if self.process_set.enabled && self.root_selectors().is_empty() {
            return Err(ConfigError::MissingSelectors);
        }
        Ok(())
    }

    /// Only meaningful after [`Config::validate`] succeeded.
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.general.delay_secs)
    }

    pub fn root_selectors(&self) -> RootSelectors {
        RootSelectors::new(
            self.process_set.pids.iter().copied(),
            &self.process_set.keywords,
        )
    }

    pub fn system_destination(&self) -> Destination {
        match &self.system.outfile {
            Some(path) => Destination::File(path.clone()),
            None => Destination::Stdout,
        }
    }

    /// Trimmed, non-empty interface names. Empty disables NIC monitoring.
    pub fn interfaces(&self) -> Vec<String> {
        self.nic
            .interfaces
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn nic_destination(&self, nic: &str) -> Destination {
        Destination::File(PathBuf::from(
            self.nic.outfile_pattern.replace(NIC_PLACEHOLDER, nic),
        ))
    }

    pub fn process_set_destination(&self) -> Destination {
        Destination::File(self.process_set.outfile.clone())
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("resmon").join("config.toml"))
}

/// Loads the default config file if there is one.
pub fn load_config() -> Result<Config, ConfigError> {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Ok(Config::default()),
    }
}

pub fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
