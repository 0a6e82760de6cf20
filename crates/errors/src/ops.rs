//! Operation orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum OpsError {
    #[error("component not found: {component}")]
    MissingComponent { component: String },

    #[error("no easyconfigs specified")]
    NoEasyconfigsSpecified,

    #[error("invalid toolchain specification '{input}', expected NAME/VERSION")]
    InvalidToolchainSpec { input: String },

    #[error("easyconfigs use different toolchains: {}", toolchains.join(", "))]
    MixedToolchains { toolchains: Vec<String> },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("background task failed: {message}")]
    TaskFailed { message: String },
}

impl UserFacingError for OpsError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoEasyconfigsSpecified => Some("Pass at least one easyconfig file."),
            Self::InvalidToolchainSpec { .. } => Some("Use the form NAME/VERSION, e.g. foss/2018b."),
            Self::MixedToolchains { .. } => Some("Tweak easyconfigs of one toolchain at a time."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MissingComponent { .. } => "ops.missing_component",
            Self::NoEasyconfigsSpecified => "ops.no_easyconfigs_specified",
            Self::InvalidToolchainSpec { .. } => "ops.invalid_toolchain_spec",
            Self::MixedToolchains { .. } => "ops.mixed_toolchains",
            Self::SerializationError { .. } => "ops.serialization_error",
            Self::TaskFailed { .. } => "ops.task_failed",
        };
        Some(code)
    }
}
