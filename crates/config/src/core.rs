//! Configuration sections

use crate::constants::{
    ARCHIVE_DIR_NAME, DEFAULT_BASE_TOOLCHAIN, DEFAULT_CARRY_OVER_PACKAGE, DEFAULT_IGNORE_DIRS,
    DEFAULT_WRAPPER_EASYBLOCK,
};
use hpcstack_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

/// Robot (easyconfig search path) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Let the resolver look up easyconfigs for missing dependencies
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Location of generated (tweaked) easyconfigs, searched first
    #[serde(default)]
    pub tweaked_path: Option<PathBuf>,
    /// Location of easyconfigs from a pending contribution, searched before `paths`
    #[serde(default)]
    pub pr_path: Option<PathBuf>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            paths: Vec::new(),
            tweaked_path: None,
            pr_path: None,
        }
    }
}

/// Dependency resolution behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Keep every dependency in the plan, ignoring installed modules
    #[serde(default)]
    pub retain_all_deps: bool,
    /// Treat "module exists but easyconfig missing" as a warning
    #[serde(default)]
    pub tolerate_missing_easyconfigs: bool,
    /// Drop requested easyconfigs whose module is already installed
    #[serde(default)]
    pub skip_available: bool,
}

/// Module availability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Module path roots; `MODULEPATH` is used when empty
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Easyconfig file search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
    /// Include archived easyconfigs in search results
    #[serde(default)]
    pub include_archived: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: default_ignore_dirs(),
            archive_dir: default_archive_dir(),
            include_archived: false,
        }
    }
}

/// A toolchain definition added on top of the built-in table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolchainDefinitionConfig {
    /// Sub-toolchain names, `system` allowed
    #[serde(default)]
    pub subtoolchains: Vec<String>,
    /// The toolchain may be absent from a parent's dependency list
    #[serde(default)]
    pub optional: bool,
    /// Capability key (`compiler`, `mpi`, ...) to family name
    #[serde(default)]
    pub capabilities: BTreeMap<String, String>,
}

/// Paired dependency carried over when mapping between toolchains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarryOverConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_carry_over_package")]
    pub package: String,
    #[serde(default = "default_base_toolchain")]
    pub base_toolchain: String,
}

impl Default for CarryOverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            package: default_carry_over_package(),
            base_toolchain: default_base_toolchain(),
        }
    }
}

/// Toolchain hierarchy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Put the system toolchain at the bottom of every hierarchy
    #[serde(default)]
    pub add_system_to_minimal_toolchains: bool,
    #[serde(default)]
    pub carry_over: CarryOverConfig,
    #[serde(default)]
    pub definitions: BTreeMap<String, ToolchainDefinitionConfig>,
}

/// Conflict checking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsConfig {
    /// Also check conflicts between the requested easyconfigs
    #[serde(default = "default_true")]
    pub check_inter_ec_conflicts: bool,
    #[serde(default = "default_wrapper_easyblock")]
    pub wrapper_easyblock: String,
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            check_inter_ec_conflicts: true,
            wrapper_easyblock: default_wrapper_easyblock(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_true() -> bool {
    true
}

fn default_ignore_dirs() -> Vec<String> {
    DEFAULT_IGNORE_DIRS.iter().map(ToString::to_string).collect()
}

fn default_archive_dir() -> String {
    ARCHIVE_DIR_NAME.to_string()
}

fn default_carry_over_package() -> String {
    DEFAULT_CARRY_OVER_PACKAGE.to_string()
}

fn default_base_toolchain() -> String {
    DEFAULT_BASE_TOOLCHAIN.to_string()
}

fn default_wrapper_easyblock() -> String {
    DEFAULT_WRAPPER_EASYBLOCK.to_string()
}
