//! YAML configuration for a benchmark session.
//!
//! ```yaml
//! modbus:
//!   host: "192.168.1.10"
//!   port: 502
//!   unit_id: 1
//!   timeout: 3.0
//! registers:
//!   start_address: 30001
//!   type: input
//! test:
//!   frequencies: [1, 5, 10]
//!   register_counts: [1, 10, 50]
//!   duration_minutes: 1.0
//! output:
//!   output_directory: results
//!   save_detailed_logs: true
//!   save_summary_stats: true
//! ```
use crate::{
    poll_interval, BaseParameters, ConfigError, RegisterType, DEFAULT_OUTPUT_DIRECTORY,
    DEFAULT_PORT, DEFAULT_TIMEOUT, DEFAULT_UNIT_ID, MAX_REGISTERS_PER_READ,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    pub modbus: TargetConfig,
    #[serde(default)]
    pub registers: RegisterConfig,
    pub test: MatrixConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// First register, either in register-map notation (30001/40001 based) or as a protocol
    /// address.
    pub start_address: u32,
    #[serde(rename = "type", default)]
    pub register_type: RegisterType,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            start_address: 0,
            register_type: RegisterType::Input,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub frequencies: Vec<f64>,
    pub register_counts: Vec<u16>,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default = "default_true")]
    pub save_detailed_logs: bool,
    #[serde(default = "default_true")]
    pub save_summary_stats: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            save_detailed_logs: true,
            save_summary_stats: true,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_unit_id() -> u8 {
    DEFAULT_UNIT_ID
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT.as_secs_f64()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)
}

fn default_true() -> bool {
    true
}

impl BenchConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BenchConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modbus.host.trim().is_empty() {
            return Err(ConfigError::Invalid("modbus.host is empty".to_string()));
        }
        match Duration::try_from_secs_f64(self.modbus.timeout) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "modbus.timeout must be a positive number of seconds; got {}",
                    self.modbus.timeout
                )))
            }
        }
        if self.test.frequencies.is_empty() {
            return Err(ConfigError::Invalid(
                "test.frequencies must list at least one frequency".to_string(),
            ));
        }
        if let Some(freq) = self
            .test
            .frequencies
            .iter()
            .find(|f| poll_interval(**f).is_err())
        {
            return Err(ConfigError::Invalid(format!(
                "test.frequencies must be positive with a representable period; got {freq}"
            )));
        }
        if self.test.register_counts.is_empty() {
            return Err(ConfigError::Invalid(
                "test.register_counts must list at least one count".to_string(),
            ));
        }
        if let Some(count) = self
            .test
            .register_counts
            .iter()
            .find(|c| **c == 0 || **c > MAX_REGISTERS_PER_READ)
        {
            return Err(ConfigError::Invalid(format!(
                "test.register_counts must be between 1 and {MAX_REGISTERS_PER_READ}; got {count}"
            )));
        }
        if Duration::try_from_secs_f64(self.test.duration_minutes * 60.).is_err() {
            return Err(ConfigError::Invalid(format!(
                "test.duration_minutes must be a non-negative, representable duration; got {}",
                self.test.duration_minutes
            )));
        }
        self.registers
            .register_type
            .protocol_address(self.registers.start_address)?;
        Ok(())
    }

    /// Per-request timeout. Values [`validate`](Self::validate) rejects saturate to
    /// [`Duration::MAX`].
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.modbus.timeout).unwrap_or(Duration::MAX)
    }

    /// Duration of each run. Values [`validate`](Self::validate) rejects saturate to
    /// [`Duration::ZERO`].
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.test.duration_minutes * 60.).unwrap_or(Duration::ZERO)
    }

    /// Resolve the parameters shared by every run of the matrix.
    pub fn base_parameters(&self) -> Result<BaseParameters, ConfigError> {
        let register_type = self.registers.register_type;
        let start_address = register_type.protocol_address(self.registers.start_address)?;
        Ok(BaseParameters {
            start_address,
            register_type,
            duration: self.duration(),
        })
    }

    /// Number of runs in the matrix.
    pub fn run_count(&self) -> usize {
        self.test.frequencies.len() * self.test.register_counts.len()
    }
}
