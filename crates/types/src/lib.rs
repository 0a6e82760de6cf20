#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for hpcstack
//!
//! This crate provides the records shared by every other crate: easyconfig
//! records and dependency references, toolchain references with their
//! capability sets, loose versions and a few CLI-facing enums.

pub mod easyconfig;
pub mod toolchain;
pub mod version;

// Re-export commonly used types
pub use easyconfig::{
    det_full_version, det_module_name, Dependency, EasyConfig, SpecKey, EASYCONFIG_EXTENSION,
};
pub use toolchain::{
    Capability, CapabilitySet, HierarchyEntry, ToolchainRef, SYSTEM_TOOLCHAIN_NAME,
};
pub use version::{LooseVersion, VersionPart};

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Tty,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Tty
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Auto
    }
}
