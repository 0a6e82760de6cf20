//! Toolchain hierarchy and mapping error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ToolchainError {
    #[error("no possible mapping from source toolchain {source_toolchain} to target hierarchy {}", .target_hierarchy.join(", "))]
    NoPossibleMapping {
        source_toolchain: String,
        target_hierarchy: Vec<String>,
    },

    #[error("no version found for subtoolchain {subtoolchain} in dependencies of {toolchain}")]
    SubtoolchainVersionNotFound {
        toolchain: String,
        subtoolchain: String,
    },

    #[error("multiple versions of subtoolchain {subtoolchain} found in dependencies of {toolchain}: {}", .versions.join(", "))]
    AmbiguousSubtoolchainVersion {
        toolchain: String,
        subtoolchain: String,
        versions: Vec<String>,
    },

    #[error("could not find {package} with {base_toolchain} toolchain in dependency tree of {toolchain} (found {found})")]
    MissingCarryOver {
        package: String,
        base_toolchain: String,
        toolchain: String,
        found: usize,
    },

    #[error("no unique versionsuffix mapping for {suffix} of {software}: {}", .candidates.join(", "))]
    NonUniqueSuffixMapping {
        software: String,
        suffix: String,
        candidates: Vec<String>,
    },
}

impl UserFacingError for ToolchainError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoPossibleMapping { .. } => {
                Some("Pick a target toolchain that offers every capability of the source toolchain.")
            }
            Self::SubtoolchainVersionNotFound { .. } | Self::AmbiguousSubtoolchainVersion { .. } => {
                Some("Check the dependencies listed in the toolchain easyconfig.")
            }
            Self::MissingCarryOver { .. } => Some(
                "Provide the paired dependency in the target toolchain or disable the carry-over policy.",
            ),
            Self::NonUniqueSuffixMapping { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NoPossibleMapping { .. } => "toolchain.no_possible_mapping",
            Self::SubtoolchainVersionNotFound { .. } => "toolchain.subtoolchain_not_found",
            Self::AmbiguousSubtoolchainVersion { .. } => "toolchain.subtoolchain_ambiguous",
            Self::MissingCarryOver { .. } => "toolchain.missing_carry_over",
            Self::NonUniqueSuffixMapping { .. } => "toolchain.non_unique_suffix_mapping",
        };
        Some(code)
    }
}
