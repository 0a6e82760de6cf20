//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields.

use hpcstack_events::{
    AppEvent, EventMessage, GeneralEvent, ResolverEvent, ToolchainEvent, TweakEvent,
};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    let level = meta.tracing_level();

    match event {
        AppEvent::Resolver(ResolverEvent::ResolutionStarted {
            requested,
            robot_enabled,
            retain_all,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                requested = ?requested,
                robot_enabled,
                retain_all,
                "Resolution started"
            );
        }
        AppEvent::Resolver(ResolverEvent::ResolutionCompleted {
            planned,
            placeholders,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                planned,
                placeholders,
                "Resolution completed"
            );
        }
        AppEvent::Resolver(
            ResolverEvent::MissingEasyconfig { module } | ResolverEvent::TotallyMissing { module },
        ) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                module = %module,
                event = ?event,
                "Unresolved dependency"
            );
        }
        AppEvent::Resolver(ResolverEvent::ConflictDetected { message }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                message = %message,
                "Conflict detected"
            );
        }
        AppEvent::Toolchain(ToolchainEvent::HierarchyBuilt {
            toolchain,
            hierarchy,
            cached,
        }) => {
            debug!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                toolchain = %toolchain,
                hierarchy = ?hierarchy,
                cached,
                "Toolchain hierarchy built"
            );
        }
        AppEvent::Toolchain(ToolchainEvent::CompilerFamilySwitch {
            source,
            target,
            from_family,
            to_family,
        }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                from = %source,
                to = %target,
                from_family = %from_family,
                to_family = %to_family,
                "Compiler family switch"
            );
        }
        AppEvent::Tweak(TweakEvent::RecordTweaked { from, to }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                from = %from,
                to = %to,
                "Easyconfig tweaked"
            );
        }
        AppEvent::General(GeneralEvent::OperationStarted { operation }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation_id = ?meta.correlation_id,
                operation = %operation,
                "Operation started"
            );
        }
        AppEvent::General(GeneralEvent::OperationCompleted { operation, success }) => {
            if *success {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    "Operation completed successfully"
                );
            } else {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    "Operation completed with issues"
                );
            }
        }
        AppEvent::General(GeneralEvent::OperationFailed { operation, failure }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation_id = ?meta.correlation_id,
                operation = %operation,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Operation failed"
            );
        }
        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                message = %message,
                context = %context,
                "Warning"
            );
        }
        _ => match level {
            tracing::Level::ERROR => {
                error!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?event, "Application event");
            }
            tracing::Level::WARN => {
                warn!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?event, "Application event");
            }
            tracing::Level::INFO => {
                info!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?event, "Application event");
            }
            tracing::Level::DEBUG => {
                debug!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?event, "Application event");
            }
            tracing::Level::TRACE => {
                trace!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?event, "Application event");
            }
        },
    }
}
