#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency resolution for hpcstack
//!
//! This crate turns a set of requested easyconfigs into an ordered build
//! plan, pulling in missing dependencies through the robot search path, and
//! checks fully expanded dependency graphs for version conflicts.

mod conflicts;
mod plan;
mod resolver;

pub use conflicts::{Conflict, ConflictChecker, ConflictReport, WrapperPolicy};
pub use plan::{BuildPlan, PlanEntry};
pub use resolver::{ResolveOptions, Resolver, MAX_RESOLVE_ITERATIONS};

use hpcstack_errors::Error;
use hpcstack_events::EventSender;
use hpcstack_index::{EasyconfigSource, ModulesTool};

/// Resolve `requested` into an ordered build plan
///
/// # Errors
///
/// Returns an error if the dependencies cannot be resolved.
pub fn resolve_dependencies(
    requested: &[PlanEntry],
    source: &dyn EasyconfigSource,
    modules: &dyn ModulesTool,
    options: ResolveOptions,
    tx: Option<EventSender>,
) -> Result<BuildPlan, Error> {
    Resolver::new(source, modules)
        .with_options(options)
        .with_event_sender(tx)
        .resolve(requested)
}

/// Check the full dependency graph of `requested` for version conflicts
///
/// # Errors
///
/// Returns an error if the dependency graph cannot be resolved.
pub fn check_conflicts(
    requested: &[PlanEntry],
    source: &dyn EasyconfigSource,
    modules: &dyn ModulesTool,
    check_inter_ec_conflicts: bool,
    tx: Option<EventSender>,
) -> Result<ConflictReport, Error> {
    ConflictChecker::new(source, modules)
        .with_inter_ec_conflicts(check_inter_ec_conflicts)
        .with_event_sender(tx)
        .check(requested)
}
