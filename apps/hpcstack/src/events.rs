//! Event handling and user feedback

use crate::logging::log_event_with_tracing;
use console::{Style, Term};
use hpcstack_events::{
    AppEvent, EventMessage, GeneralEvent, ResolverEvent, ToolchainEvent, TweakEvent,
};

/// Event handler printing notable events to stderr
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    /// Also show debug-level events
    debug_enabled: bool,
    /// Suppress all console output (JSON mode)
    quiet: bool,
}

impl EventHandler {
    /// Create new event handler
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: &EventMessage) {
        log_event_with_tracing(message);
        if self.quiet {
            return;
        }
        if let Some((kind, text)) = self.describe(&message.event) {
            self.show(kind, &text);
        }
    }

    /// User-facing line for an event, if it should be shown
    fn describe(&self, event: &AppEvent) -> Option<(Kind, String)> {
        match event {
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                Some((Kind::Warning, format!("{message}: {context}")))
            }
            AppEvent::Resolver(ResolverEvent::MissingEasyconfig { module }) => Some((
                Kind::Warning,
                format!("No easyconfig found for installed module {module}"),
            )),
            AppEvent::Resolver(ResolverEvent::TotallyMissing { module }) => Some((
                Kind::Warning,
                format!("Neither a module nor an easyconfig exists for {module}"),
            )),
            AppEvent::Resolver(ResolverEvent::AlreadyInstalled { module }) => Some((
                Kind::Info,
                format!("{module} is already installed (module found), skipping"),
            )),
            AppEvent::Tweak(TweakEvent::EasyconfigObtained {
                module,
                template,
                generated: true,
            }) => Some((Kind::Info, format!("Generating {module} from {template}"))),
            AppEvent::Resolver(ResolverEvent::ConflictDetected { message }) => {
                Some((Kind::Warning, message.clone()))
            }
            AppEvent::Toolchain(ToolchainEvent::CompilerFamilySwitch {
                source,
                target,
                from_family,
                to_family,
            }) => Some((
                Kind::Warning,
                format!("Mapping {source} to {target} switches compilers from {from_family} to {to_family}"),
            )),
            AppEvent::Toolchain(ToolchainEvent::CarryOver {
                package,
                version,
                versionsuffix,
            }) => Some((
                Kind::Info,
                format!("Using {package} {version}{versionsuffix} of the target toolchain"),
            )),
            AppEvent::Tweak(TweakEvent::RecordTweaked { from, to }) if self.debug_enabled => {
                Some((Kind::Debug, format!("{from} -> {to}")))
            }
            _ if self.debug_enabled => Some((Kind::Debug, format!("{event:?}"))),
            _ => None,
        }
    }

    fn show(&self, kind: Kind, text: &str) {
        let (label, style) = match kind {
            Kind::Info => ("info", Style::new().cyan()),
            Kind::Warning => ("warning", Style::new().yellow().bold()),
            Kind::Debug => ("debug", Style::new().dim()),
        };
        let label = if self.colors_enabled {
            style.apply_to(label).to_string()
        } else {
            label.to_string()
        };
        // stderr may be closed; feedback is best effort
        let _ = self.term.write_line(&format!("{label}: {text}"));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Info,
    Warning,
    Debug,
}
