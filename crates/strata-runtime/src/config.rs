//! Runtime configuration (strata.toml format).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::ConfigError;
use crate::fault::{self, DEFAULT_SIGNALS};

/// Root runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Hardware fault interception.
    #[serde(default)]
    pub faults: FaultConfig,

    /// Behavior of `run_main` for unhandled exceptions.
    #[serde(default)]
    pub exit: ExitConfig,
}

/// Hardware fault interception settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultConfig {
    /// Install trap handlers at all. When false every fault is fatal.
    #[serde(default = "default_true")]
    pub intercept: bool,

    /// Signal names to intercept ("SIGFPE", "SIGSEGV", "SIGILL", "SIGBUS").
    #[serde(default = "default_signals")]
    pub signals: Vec<String>,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            intercept: true,
            signals: default_signals(),
        }
    }
}

/// Unhandled-exception settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitConfig {
    /// Process exit code when `run_main` sees an unhandled exception.
    #[serde(default = "default_exit_code")]
    pub unhandled_exception_code: i32,

    /// Print "Exception: <message>" to stderr before exiting.
    #[serde(default = "default_true")]
    pub report_unhandled: bool,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            unhandled_exception_code: default_exit_code(),
            report_unhandled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_exit_code() -> i32 {
    1
}

fn default_signals() -> Vec<String> {
    DEFAULT_SIGNALS.iter().map(|s| s.to_string()).collect()
}

static ACTIVE: OnceLock<RuntimeConfig> = OnceLock::new();

impl RuntimeConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and signal names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let code = self.exit.unhandled_exception_code;
        if !(1..=255).contains(&code) {
            return Err(ConfigError::Validation(format!(
                "unhandled_exception_code must be in 1..=255, got {code}"
            )));
        }
        if let Some(unknown) = self
            .faults
            .signals
            .iter()
            .find(|name| fault::parse_signal(name).is_none())
        {
            return Err(ConfigError::Validation(format!(
                "unknown signal name: {unknown}"
            )));
        }
        Ok(())
    }

    /// The configuration the runtime was initialised with, or the defaults
    /// when [`crate::init_with`] was never called.
    pub fn active() -> &'static RuntimeConfig {
        ACTIVE.get_or_init(RuntimeConfig::default)
    }

    /// Make `self` the active configuration. Only the first call wins.
    pub(crate) fn activate(self) -> &'static RuntimeConfig {
        ACTIVE.get_or_init(|| self)
    }
}
