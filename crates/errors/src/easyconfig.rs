//! Easyconfig lookup and parsing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum EasyconfigError {
    #[error("failed to parse easyconfig {path}: {message}")]
    ParseFailed { path: String, message: String },

    #[error("easyconfig file not found: {path}")]
    FileNotFound { path: String },

    #[error("no easyconfig found for {name} {version}")]
    NotFound { name: String, version: String },

    #[error("easyconfig file {path} does not provide module {expected} (found {found})")]
    ModuleMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("invalid multi_deps in {name}: {message}")]
    InvalidMultiDeps { name: String, message: String },

    #[error("invalid search pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to serialize easyconfig {name}: {message}")]
    SerializeFailed { name: String, message: String },

    #[error("no easyconfigs found for {name}")]
    NoEasyconfigsFor { name: String },

    #[error("no easyconfigs for {name} use toolchain {toolchain} (available: {})", available.join(", "))]
    ToolchainUnavailable {
        name: String,
        toolchain: String,
        available: Vec<String>,
    },

    #[error("easyconfigs for {name} use several toolchains: {}", available.join(", "))]
    AmbiguousToolchain { name: String, available: Vec<String> },

    #[error("easyconfigs for {name} use several versionsuffixes: {}", available.join(", "))]
    AmbiguousVersionsuffix { name: String, available: Vec<String> },

    #[error("{count} easyconfigs for {name} match, expected exactly one")]
    NoUniqueMatch { name: String, count: usize },
}

impl UserFacingError for EasyconfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ParseFailed { .. } => Some("Check the YAML syntax of the easyconfig file."),
            Self::FileNotFound { .. } | Self::NotFound { .. } => {
                Some("Add the directory holding the easyconfig to the robot search path.")
            }
            Self::ModuleMismatch { .. } => Some(
                "Rename the easyconfig file or fix its name, version, toolchain and versionsuffix.",
            ),
            Self::InvalidMultiDeps { .. } => {
                Some("Every multi_deps entry must list the same number of versions.")
            }
            Self::InvalidPattern { .. } => Some("Use a valid regular expression."),
            Self::SerializeFailed { .. } => None,
            Self::NoEasyconfigsFor { .. } => {
                Some("Add a directory holding easyconfigs for this software to the robot search path.")
            }
            Self::ToolchainUnavailable { .. } | Self::AmbiguousToolchain { .. } => {
                Some("Pass one of the available toolchains with --toolchain.")
            }
            Self::AmbiguousVersionsuffix { .. } => {
                Some("Pass one of the available versionsuffixes with --versionsuffix.")
            }
            Self::NoUniqueMatch { .. } => {
                Some("Narrow the request with --toolchain or --versionsuffix.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ParseFailed { .. } => "easyconfig.parse_failed",
            Self::FileNotFound { .. } => "easyconfig.file_not_found",
            Self::NotFound { .. } => "easyconfig.not_found",
            Self::ModuleMismatch { .. } => "easyconfig.module_mismatch",
            Self::InvalidMultiDeps { .. } => "easyconfig.invalid_multi_deps",
            Self::InvalidPattern { .. } => "easyconfig.invalid_pattern",
            Self::SerializeFailed { .. } => "easyconfig.serialize_failed",
            Self::NoEasyconfigsFor { .. } => "easyconfig.no_easyconfigs_for",
            Self::ToolchainUnavailable { .. } => "easyconfig.toolchain_unavailable",
            Self::AmbiguousToolchain { .. } => "easyconfig.ambiguous_toolchain",
            Self::AmbiguousVersionsuffix { .. } => "easyconfig.ambiguous_versionsuffix",
            Self::NoUniqueMatch { .. } => "easyconfig.no_unique_match",
        };
        Some(code)
    }
}
