//! Dependency resolution error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ResolveError {
    /// All offending dependencies of one resolution run, reported together.
    #[error("irresolvable dependencies encountered: {}", .missing.join(", "))]
    Irresolvable { missing: Vec<String> },

    #[error("missing modules for dependencies marked as external modules: {}", .modules.join(", "))]
    MissingExternalModules { modules: Vec<String> },

    #[error("dependency cycle detected between: {}", .modules.join(", "))]
    DependencyCycle { modules: Vec<String> },

    #[error("dependency resolution did not finish within {limit} iterations")]
    LoopLimitExceeded { limit: usize },
}

impl UserFacingError for ResolveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Irresolvable { .. } => Some(
                "Enable the robot and extend the robot path, or install the missing modules first.",
            ),
            Self::MissingExternalModules { .. } => {
                Some("Make the external modules available in MODULEPATH.")
            }
            Self::DependencyCycle { .. } => {
                Some("Break the cycle by removing one of the listed dependencies.")
            }
            Self::LoopLimitExceeded { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Irresolvable { .. } => "resolve.irresolvable",
            Self::MissingExternalModules { .. } => "resolve.missing_external_modules",
            Self::DependencyCycle { .. } => "resolve.dependency_cycle",
            Self::LoopLimitExceeded { .. } => "resolve.loop_limit_exceeded",
        };
        Some(code)
    }
}
