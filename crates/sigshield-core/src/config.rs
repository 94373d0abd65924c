//! Configuration management
//!
//! The layer reads an optional TOML file at load time. Every field has a
//! default, and the defaults enable every correction, so running without a
//! config file is the normal case.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recovery::CorrectionPolicy;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "SIGSHIELD_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    NoConfigDir,
}

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Memory-fault corrections
    pub faults: FaultsConfig,
    /// Trap corrections
    pub traps: TrapsConfig,
    /// Handler guard
    pub guard: GuardConfig,
    /// Syscall filter
    pub syscalls: SyscallsConfig,
}

/// Memory-fault settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FaultsConfig {
    /// Resume after a call through a null function pointer
    pub null_calls: bool,
    /// Return 0 from a function that dereferenced a null pointer
    pub null_derefs: bool,
}

impl Default for FaultsConfig {
    fn default() -> Self {
        Self {
            null_calls: true,
            null_derefs: true,
        }
    }
}

/// Trap settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrapsConfig {
    /// Skip past int3/ud2 assertion stubs
    pub abort_stubs: bool,
}

impl Default for TrapsConfig {
    fn default() -> Self {
        Self { abort_stubs: true }
    }
}

/// Guard settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuardConfig {
    /// Refuse handler replacement for the protected signals
    pub enabled: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Syscall filter settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyscallsConfig {
    /// Refuse the designated syscall
    pub filter: bool,
    /// Syscall number to refuse with ENOSYS
    pub designated: i64,
}

impl Default for SyscallsConfig {
    fn default() -> Self {
        Self {
            filter: true,
            designated: 435,
        }
    }
}

impl Config {
    /// Correction switches for the signal handlers
    pub fn policy(&self) -> CorrectionPolicy {
        CorrectionPolicy {
            null_calls: self.faults.null_calls,
            null_derefs: self.faults.null_derefs,
            abort_stubs: self.traps.abort_stubs,
        }
    }

    /// Syscall filter built from the `[syscalls]` section
    #[cfg(unix)]
    pub fn syscall_filter(&self) -> crate::syscall::SyscallFilter {
        if self.syscalls.filter {
            crate::syscall::SyscallFilter::new(self.syscalls.designated)
        } else {
            crate::syscall::SyscallFilter::disabled()
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sigshield").map(|p| p.config_dir().to_path_buf())
}

/// Get the config file path, honouring `SIGSHIELD_CONFIG`
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    config_dir().map(|p| p.join("config.toml"))
}

/// Load configuration from the default location
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}

/// Load configuration from `path`; a missing file yields defaults
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.policy(), CorrectionPolicy::ALL);
        assert!(config.guard.enabled);
        assert!(config.syscalls.filter);
        assert_eq!(config.syscalls.designated, 435);
    }

    #[cfg(unix)]
    #[test]
    fn test_default_filter_is_clone3() {
        let config = Config::default();
        assert_eq!(
            config.syscall_filter().designated(),
            Some(crate::syscall::SYS_CLONE3)
        );
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(serialized.contains("[faults]"));
        assert!(serialized.contains("[syscalls]"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[traps]\nabort_stubs = false\n\n[syscalls]\nfilter = false").unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert!(!config.traps.abort_stubs);
        assert!(config.faults.null_calls);
        assert!(config.faults.null_derefs);
        assert!(config.guard.enabled);
        assert!(!config.policy().abort_stubs);
        #[cfg(unix)]
        assert_eq!(config.syscall_filter().designated(), None);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[faults]\nnull_calls = \"yes\"").unwrap();

        let err = load_config_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
