use serde::{Deserialize, Serialize};

use crate::EventSource;
use hpcstack_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Optional stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod resolver;
pub mod toolchain;
pub mod tweak;

pub use general::*;
pub use resolver::*;
pub use toolchain::*;
pub use tweak::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Dependency resolution and conflict checking
    Resolver(ResolverEvent),

    /// Toolchain hierarchies and mappings
    Toolchain(ToolchainEvent),

    /// Version selection and easyconfig tweaking
    Tweak(TweakEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Resolver(
                ResolverEvent::ConflictDetected { .. } | ResolverEvent::ConflictCheckCompleted { .. },
            ) => EventSource::CONFLICTS,
            Self::Resolver(_) => EventSource::RESOLVER,
            Self::Toolchain(_) => EventSource::TOOLCHAIN,
            Self::Tweak(_) => EventSource::TWEAK,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::OperationFailed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Toolchain(ToolchainEvent::CompilerFamilySwitch { .. }) => Level::WARN,
            Self::Resolver(event) if event.is_warning() => Level::WARN,

            Self::Resolver(ResolverEvent::RecordResolved { .. } | ResolverEvent::RobotLookup { .. })
            | Self::Toolchain(ToolchainEvent::MappingSelected { .. })
            | Self::Tweak(TweakEvent::SuffixMapped { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }
}

