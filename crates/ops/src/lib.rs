#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations orchestration for hpcstack
//!
//! This crate serves as the orchestration layer between the CLI and the
//! library crates. Every operation is synchronous, takes an [`OpsCtx`] and
//! returns a serialisable report; the CLI moves them onto a blocking thread.

mod context;
mod query;
mod resolve;
mod toolchain;
mod tweak;
mod types;

pub use context::{robot_paths, search_options, OpsContextBuilder, OpsCtx};
pub use query::{pick_version, search};
pub use resolve::{
    check_conflicts, dep_graph, dry_run, dry_run_overview, load_requested, resolve, DryRunOptions,
};
pub use toolchain::{hierarchy, map_toolchains, parse_toolchain};
pub use tweak::{obtain, tweak};
pub use hpcstack_tweak::EasyconfigRequest;
pub use types::{
    BuildStatus, ConflictsReport, DepGraphReport, DryRunItem, DryRunReport, HierarchyReport,
    MappingReport, ObtainReport, PlannedModule, ResolveReport, SearchReport, TweakReport,
    TweakedModule, VersionPick, SHORT_PREFIX_VAR,
};

use hpcstack_errors::Error;
use hpcstack_events::EventEmitter;

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// Ordered build plan
    BuildOrder(ResolveReport),
    /// Dry-run overview
    DryRun(DryRunReport),
    /// Conflict check outcome
    Conflicts(ConflictsReport),
    /// Toolchain hierarchy
    Hierarchy(HierarchyReport),
    /// Toolchain mapping
    Mapping(MappingReport),
    /// Search results
    SearchResults(SearchReport),
    /// Picked version
    VersionPick(VersionPick),
    /// Tweaked easyconfigs
    Tweak(TweakReport),
    /// Selected or generated easyconfig
    Obtain(ObtainReport),
    /// Written dependency graph
    DepGraph(DepGraphReport),
    /// Generic success message
    Success(String),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be serialized.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| {
            hpcstack_errors::OpsError::SerializationError {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Check if this is a success result
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            OperationResult::BuildOrder(_)
            | OperationResult::DryRun(_)
            | OperationResult::Hierarchy(_)
            | OperationResult::Mapping(_)
            | OperationResult::SearchResults(_)
            | OperationResult::VersionPick(_)
            | OperationResult::Tweak(_)
            | OperationResult::Obtain(_)
            | OperationResult::DepGraph(_)
            | OperationResult::Success(_) => true,
            OperationResult::Conflicts(report) => !report.conflicts_found,
        }
    }
}

/// Run `op` between operation started and completed/failed events
///
/// # Errors
///
/// Returns the error of `op`.
pub fn run_operation<T>(
    ctx: &OpsCtx,
    name: &str,
    op: impl FnOnce(&OpsCtx) -> Result<T, Error>,
) -> Result<T, Error> {
    ctx.emit_operation_started(name);
    let result = op(ctx);
    match &result {
        Ok(_) => ctx.emit_operation_completed(name, true),
        Err(err) => ctx.emit_operation_failed(name, err),
    }
    result
}
