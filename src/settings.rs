//! Configuration management for qcflow.
//!
//! Program behavior is customized through INI-format configuration files with
//! the following precedence:
//!
//! 1. Local configuration (`./qcflow_config.cfg`)
//! 2. User configuration (`~/.config/qcflow/qcflow_config.cfg`)
//! 3. System configuration (`/etc/qcflow/qcflow_config.cfg`)
//! 4. Built-in defaults
//!
//! # Configuration File Format
//!
//! ```ini
//! [qchem]
//! cmd = qchem
//! nprocs = 4
//! max_scf_cycles = 200
//!
//! [runtime]
//! check_convergence = true
//! gzip_inputs = true
//! workdir = /scratch/jobs
//!
//! [logging]
//! level = info
//! ```
//!
//! Jobs take a [`Settings`] value explicitly, so test suites can construct
//! one with `check_convergence` disabled instead of mutating global state.

use configparser::ini::Ini;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Main configuration structure containing all program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Q-Chem invocation settings
    pub qchem: QChemSettings,
    /// Runtime behavior settings
    pub runtime: RuntimeSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Q-Chem invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QChemSettings {
    /// Q-Chem command (default: "qchem")
    pub cmd: String,
    /// Number of processors passed to Q-Chem (default: 1)
    pub nprocs: u32,
    /// SCF cycle cap written into every `$rem` block (default: 200)
    pub max_scf_cycles: u32,
}

impl Default for QChemSettings {
    fn default() -> Self {
        Self {
            cmd: "qchem".to_string(),
            nprocs: 1,
            max_scf_cycles: 200,
        }
    }
}

/// Runtime behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Raise an error when results cannot be read or the SCF did not
    /// converge (default: true). Test suites replaying fixtures disable it.
    pub check_convergence: bool,
    /// Gzip the input file after a run completes (default: true)
    pub gzip_inputs: bool,
    /// Working directory for calculations; `None` means the process
    /// current directory
    pub workdir: Option<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            check_convergence: true,
            gzip_inputs: true,
            workdir: None,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads configuration from the first available configuration file.
    ///
    /// Searches `./qcflow_config.cfg`, then the user and system paths, and
    /// falls back to built-in defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        for path in Self::candidate_paths() {
            if path.exists() {
                info!("loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
            debug!("no configuration at {}", path.display());
        }
        Ok(Self::default())
    }

    /// Loads configuration from a specific INI file, filling omitted keys
    /// with defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut ini = Ini::new();
        ini.load(path).map_err(ConfigError::IniParse)?;

        let mut settings = Self::default();

        if let Some(cmd) = ini.get("qchem", "cmd") {
            settings.qchem.cmd = cmd;
        }
        if let Some(nprocs) = ini.get("qchem", "nprocs") {
            settings.qchem.nprocs = nprocs
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("qchem.nprocs: {}", nprocs)))?;
        }
        if let Some(cycles) = ini.get("qchem", "max_scf_cycles") {
            settings.qchem.max_scf_cycles = cycles.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("qchem.max_scf_cycles: {}", cycles))
            })?;
        }
        if let Some(check) = parse_bool(&ini, "runtime", "check_convergence")? {
            settings.runtime.check_convergence = check;
        }
        if let Some(gzip) = parse_bool(&ini, "runtime", "gzip_inputs")? {
            settings.runtime.gzip_inputs = gzip;
        }
        if let Some(workdir) = ini.get("runtime", "workdir") {
            settings.runtime.workdir = Some(PathBuf::from(workdir));
        }
        if let Some(level) = ini.get("logging", "level") {
            settings.logging.level = level;
        }

        Ok(settings)
    }

    /// The directory calculations run in: the configured `runtime.workdir`
    /// or the process current directory.
    pub fn resolved_workdir(&self) -> Result<PathBuf, ConfigError> {
        match &self.runtime.workdir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./qcflow_config.cfg")];
        if let Ok(home) = std::env::var("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("qcflow")
                    .join("qcflow_config.cfg"),
            );
        }
        paths.push(PathBuf::from("/etc/qcflow/qcflow_config.cfg"));
        paths
    }
}

fn parse_bool(ini: &Ini, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
    match ini.get(section, key) {
        None => Ok(None),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            other => Err(ConfigError::InvalidValue(format!(
                "{}.{}: {}",
                section, key, other
            ))),
        },
    }
}
