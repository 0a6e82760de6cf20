#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for hpcstack
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/hpcstack/config.toml)
//! - Environment variables
//! - CLI flags (applied by the CLI itself)

pub mod constants;
pub mod core;

pub use crate::core::{
    CarryOverConfig, ConflictsConfig, GeneralConfig, ModulesConfig, ResolveConfig, RobotConfig,
    SearchConfig, ToolchainConfig, ToolchainDefinitionConfig,
};

use hpcstack_errors::{ConfigError, Error};
use hpcstack_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub robot: RobotConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub modules: ModulesConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub conflicts: ConflictsConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::CONFIG_FILE_NAME))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&contents)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Merge with values from an arbitrary lookup (used by `merge_env`)
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed into the expected type.
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // HPCSTACK_OUTPUT
        if let Some(output) = lookup("HPCSTACK_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "HPCSTACK_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // HPCSTACK_COLOR
        if let Some(color) = lookup("HPCSTACK_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "HPCSTACK_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // HPCSTACK_ROBOT_PATHS, colon separated
        if let Some(paths) = lookup("HPCSTACK_ROBOT_PATHS") {
            self.robot.paths = split_path_list(&paths);
        }

        // HPCSTACK_MODULEPATH wins over MODULEPATH
        if let Some(paths) = lookup("HPCSTACK_MODULEPATH") {
            self.modules.paths = split_path_list(&paths);
        } else if self.modules.paths.is_empty() {
            if let Some(paths) = lookup("MODULEPATH") {
                self.modules.paths = split_path_list(&paths);
            }
        }

        if let Some(value) = lookup("HPCSTACK_RETAIN_ALL_DEPS") {
            self.resolve.retain_all_deps = parse_bool("HPCSTACK_RETAIN_ALL_DEPS", value)?;
        }

        if let Some(value) = lookup("HPCSTACK_TOLERATE_MISSING") {
            self.resolve.tolerate_missing_easyconfigs =
                parse_bool("HPCSTACK_TOLERATE_MISSING", value)?;
        }

        if let Some(value) = lookup("HPCSTACK_SKIP_AVAILABLE") {
            self.resolve.skip_available = parse_bool("HPCSTACK_SKIP_AVAILABLE", value)?;
        }

        Ok(())
    }
}

fn split_path_list(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .filter(|part| !part.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
