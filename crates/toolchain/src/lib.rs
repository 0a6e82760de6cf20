#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Toolchain reasoning for hpcstack
//!
//! A toolchain hierarchy lists a toolchain and all of its sub-toolchains,
//! most basic first. This crate builds such hierarchies from a registry of
//! toolchain definitions plus the toolchain easyconfigs, decides which
//! toolchains can stand in for one another, and maps a complete source
//! hierarchy onto a target hierarchy.

mod capability;
mod hierarchy;
mod mapping;
mod registry;

pub use capability::can_substitute;
pub use hierarchy::{HierarchyBuilder, HierarchyCache};
pub use mapping::{
    map_hierarchies, needs_carry_over, select_target, HierarchyMapper, PairedDependencyPolicy,
    ToolchainMapping, VersionOverride,
};
pub use registry::{ToolchainDefinition, ToolchainRegistry};

use hpcstack_errors::Error;
use hpcstack_events::EventSender;
use hpcstack_index::{EasyconfigSource, ModulesTool};
use hpcstack_types::{HierarchyEntry, ToolchainRef};

/// Hierarchy of `toolchain` without caching
///
/// # Errors
///
/// Returns an error if the hierarchy cannot be determined.
pub fn get_toolchain_hierarchy(
    toolchain: &ToolchainRef,
    registry: &ToolchainRegistry,
    source: &dyn EasyconfigSource,
    incl_capabilities: bool,
    tx: Option<EventSender>,
) -> Result<Vec<HierarchyEntry>, Error> {
    HierarchyBuilder::new(registry, source)
        .with_event_sender(tx)
        .build(toolchain, incl_capabilities)
}

/// Mapping from the hierarchy of `source_tc` onto that of `target_tc`,
/// carrying over the default paired dependency
///
/// # Errors
///
/// Returns an error if a hierarchy cannot be built or mapped.
pub fn map_toolchain_hierarchies(
    source_tc: &ToolchainRef,
    target_tc: &ToolchainRef,
    builder: &HierarchyBuilder<'_>,
    modules: &dyn ModulesTool,
    tx: Option<EventSender>,
) -> Result<ToolchainMapping, Error> {
    HierarchyMapper::new(builder, modules)
        .with_event_sender(tx)
        .map(source_tc, target_tc)
}
