use crate::core::executor::{
    default_command_flags, default_file_flags, DEFAULT_INLINE_OUTPUT_SUFFIX, DEFAULT_INTERPRETER,
    DEFAULT_MAX_OUTPUT_BYTES,
};
use crate::domain::ports::BridgeSettings;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_positive_number, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub service: ServiceConfig,
    pub powershell: PowerShellConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "dhcp-agent".to_string(),
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerShellConfig {
    pub interpreter: String,
    pub execution_flags: Vec<String>,
    pub command_flags: Vec<String>,
    /// Appended to inline commands; the JSON depth and compression live here.
    pub inline_output_suffix: String,
    pub module_path: PathBuf,
    pub execution_timeout_ms: u64,
    pub max_concurrent: usize,
    pub max_output_bytes: usize,
}

impl Default for PowerShellConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            execution_flags: default_file_flags(),
            command_flags: default_command_flags(),
            inline_output_suffix: DEFAULT_INLINE_OUTPUT_SUFFIX.to_string(),
            module_path: PathBuf::from("modules/DHCPReservationManager"),
            execution_timeout_ms: 30_000,
            max_concurrent: 5,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `compact` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Loads a config file, substituting `${VAR}` references first.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BridgeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses config text. Missing sections fall back to their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BridgeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Unset variables are left as written, e.g. `${DHCP_MODULE_ROOT}`.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BridgeError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Environment variables win over file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) -> Result<()> {
        if let Some(value) = lookup("DHCP_AGENT_TIMEOUT_MS") {
            self.powershell.execution_timeout_ms = parse_override("DHCP_AGENT_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("DHCP_AGENT_MAX_CONCURRENT") {
            self.powershell.max_concurrent = parse_override("DHCP_AGENT_MAX_CONCURRENT", &value)?;
        }
        if let Some(value) = lookup("DHCP_AGENT_MODULE_PATH") {
            self.powershell.module_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("DHCP_AGENT_INTERPRETER") {
            self.powershell.interpreter = value;
        }
        if let Some(value) = lookup("LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.service.environment == "production"
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| BridgeError::InvalidConfigValueError {
            field: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl BridgeSettings for BridgeConfig {
    fn interpreter(&self) -> &str {
        &self.powershell.interpreter
    }

    fn execution_flags(&self) -> &[String] {
        &self.powershell.execution_flags
    }

    fn command_flags(&self) -> &[String] {
        &self.powershell.command_flags
    }

    fn inline_output_suffix(&self) -> &str {
        &self.powershell.inline_output_suffix
    }

    fn module_path(&self) -> &Path {
        &self.powershell.module_path
    }

    fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.powershell.execution_timeout_ms)
    }

    fn max_concurrent(&self) -> usize {
        self.powershell.max_concurrent
    }

    fn max_output_bytes(&self) -> usize {
        self.powershell.max_output_bytes
    }
}

impl Validate for BridgeConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("powershell.interpreter", &self.powershell.interpreter)?;
        validate_path(
            "powershell.module_path",
            &self.powershell.module_path.to_string_lossy(),
        )?;
        validate_positive_number(
            "powershell.execution_timeout_ms",
            self.powershell.execution_timeout_ms as usize,
            1,
        )?;
        validate_positive_number("powershell.max_concurrent", self.powershell.max_concurrent, 1)?;
        if self.powershell.max_concurrent > Semaphore::MAX_PERMITS {
            return Err(BridgeError::InvalidConfigValueError {
                field: "powershell.max_concurrent".to_string(),
                value: self.powershell.max_concurrent.to_string(),
                reason: format!("Must not exceed {}", Semaphore::MAX_PERMITS),
            });
        }
        validate_positive_number("powershell.max_output_bytes", self.powershell.max_output_bytes, 1)?;

        let valid_formats = ["compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(BridgeError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
                reason: format!("Unsupported format. Valid formats: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}
