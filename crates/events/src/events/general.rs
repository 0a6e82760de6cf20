use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Events not tied to one domain: warnings and operation lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Warning about the environment, e.g. a missing search path
    Warning { message: String, context: String },

    /// An operation began
    OperationStarted { operation: String },

    /// An operation finished
    OperationCompleted { operation: String, success: bool },

    /// An operation returned an error
    OperationFailed {
        operation: String,
        failure: FailureContext,
    },
}

impl GeneralEvent {
    /// Create a warning event about `context` (a path, a module name)
    pub fn warning(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: context.into(),
        }
    }
}
