#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for hpcstack
//!
//! Library crates never print. Warnings, progress notes and diagnostics are
//! sent as typed events over a channel and rendered by the CLI, which also
//! forwards them to `tracing`.
//!
//! - **Domain events**: grouped by functional domain (resolver, toolchain, tweak)
//! - **`EventEmitter` trait**: one API for emitting from anything holding a sender
//! - **Metadata**: every event travels with an [`EventMeta`] carrying id, time,
//!   level and source

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, FailureContext, GeneralEvent, ResolverEvent, ToolchainEvent, TweakEvent,
};

use hpcstack_errors::UserFacingError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// An event together with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    #[must_use]
    pub fn new(meta: EventMeta, event: AppEvent) -> Self {
        Self { meta, event }
    }

    /// Wrap an event with metadata derived from its domain and level
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let meta = EventMeta::new(event.log_level(), event.event_source());
        Self { meta, event }
    }
}

/// Type alias for the event sender
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout hpcstack
///
/// Implemented by the raw `EventSender` and by any struct that holds an
/// optional sender. Emitting without a sender is a no-op.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Send a fully built message
    fn send_message(&self, message: EventMessage) {
        if let Some(sender) = self.event_sender() {
            // Receiver may be gone; events are best effort.
            let _ = sender.send(message);
        }
    }

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        self.send_message(EventMessage::from_event(event));
    }

    /// Emit an event tagged with a correlation id (the operation name)
    fn emit_correlated(&self, correlation_id: impl Into<String>, event: AppEvent) {
        let mut message = EventMessage::from_event(event);
        message.meta = message.meta.with_correlation_id(correlation_id);
        self.send_message(message);
    }

    /// Emit a warning event about `context`
    fn emit_warning(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message, context)));
    }

    /// Emit an operation started event
    fn emit_operation_started(&self, operation: impl Into<String>) {
        let operation = operation.into();
        self.emit_correlated(
            operation.clone(),
            AppEvent::General(GeneralEvent::OperationStarted { operation }),
        );
    }

    /// Emit an operation completed event
    fn emit_operation_completed(&self, operation: impl Into<String>, success: bool) {
        let operation = operation.into();
        self.emit_correlated(
            operation.clone(),
            AppEvent::General(GeneralEvent::OperationCompleted { operation, success }),
        );
    }

    /// Emit an operation failed event built from a user-facing error
    fn emit_operation_failed<E: UserFacingError + ?Sized>(
        &self,
        operation: impl Into<String>,
        error: &E,
    ) {
        let operation = operation.into();
        self.emit_correlated(
            operation.clone(),
            AppEvent::General(GeneralEvent::OperationFailed {
                operation,
                failure: FailureContext::from_error(error),
            }),
        );
    }

    /// Emit a resolver event
    fn emit_resolver(&self, event: ResolverEvent) {
        self.emit(AppEvent::Resolver(event));
    }

    /// Emit a toolchain event
    fn emit_toolchain(&self, event: ToolchainEvent) {
        self.emit(AppEvent::Toolchain(event));
    }

    /// Emit a tweak event
    fn emit_tweak(&self, event: TweakEvent) {
        self.emit(AppEvent::Tweak(event));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// Implementation for optional senders, so components can run silently
impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[tokio::test]
    async fn test_emit_attaches_meta() {
        let (tx, mut rx) = channel();
        tx.emit_warning("robot path does not exist", "/ecs/missing");
        tx.emit_resolver(ResolverEvent::MissingEasyconfig {
            module: "zlib/1.2.11".into(),
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.meta.level, EventLevel::Warn);
        assert_eq!(first.meta.source, EventSource::GENERAL);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.meta.source, EventSource::RESOLVER);
        assert_eq!(second.event.log_level(), Level::WARN);
    }

    #[test]
    fn test_conflict_events_use_conflict_source() {
        let event = AppEvent::Resolver(ResolverEvent::ConflictDetected {
            message: "Conflict".into(),
        });
        assert_eq!(event.event_source(), EventSource::CONFLICTS);
    }

    #[test]
    fn test_missing_sender_is_silent() {
        let none: Option<EventSender> = None;
        none.emit_warning("dropped", "nowhere");
    }

    #[test]
    fn test_operation_failed_carries_error_code() {
        let (tx, mut rx) = channel();
        let err = hpcstack_errors::VersionError::NoCandidates;
        tx.emit_operation_failed("pick-version", &err);
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.meta.correlation_id.as_deref(), Some("pick-version"));
        match msg.event {
            AppEvent::General(GeneralEvent::OperationFailed { failure, .. }) => {
                assert_eq!(failure.code.as_deref(), Some("version.no_candidates"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(msg.meta.level, EventLevel::Error);
    }
}
