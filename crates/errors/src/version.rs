//! Version parsing and selection error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("no versions available to pick from")]
    NoCandidates,
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidVersion { .. } => Some("Versions must be non-empty, e.g. 1.2.3."),
            Self::NoCandidates => Some("Extend the robot path so that matching easyconfigs can be found."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidVersion { .. } => "version.invalid_version",
            Self::NoCandidates => "version.no_candidates",
        };
        Some(code)
    }
}
