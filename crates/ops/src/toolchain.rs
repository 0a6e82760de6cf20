//! Toolchain hierarchies and mappings

use crate::types::{HierarchyReport, MappingReport};
use crate::OpsCtx;
use hpcstack_errors::{Error, OpsError};
use hpcstack_types::ToolchainRef;

/// Parse `name/version` (or `system`)
///
/// # Errors
///
/// Returns an error if `input` is not a toolchain specification.
pub fn parse_toolchain(input: &str) -> Result<ToolchainRef, Error> {
    ToolchainRef::parse_spec(input).ok_or_else(|| {
        OpsError::InvalidToolchainSpec {
            input: input.to_string(),
        }
        .into()
    })
}

/// Hierarchy of `toolchain`, optionally with the capabilities of each level
///
/// # Errors
///
/// Returns an error if the specification is invalid or the hierarchy cannot
/// be determined.
pub fn hierarchy(ctx: &OpsCtx, toolchain: &str, capabilities: bool) -> Result<HierarchyReport, Error> {
    let tc = parse_toolchain(toolchain)?;
    let levels = ctx.hierarchy_builder().build(&tc, capabilities)?;
    Ok(HierarchyReport {
        toolchain: tc.to_string(),
        levels,
    })
}

/// Map every level of the `source` hierarchy onto the `target` hierarchy
///
/// # Errors
///
/// Returns an error if a specification is invalid, a hierarchy cannot be
/// built, or some level has no substitute.
pub fn map_toolchains(ctx: &OpsCtx, source: &str, target: &str) -> Result<MappingReport, Error> {
    let source_tc = parse_toolchain(source)?;
    let target_tc = parse_toolchain(target)?;
    let builder = ctx.hierarchy_builder();
    let mapping = ctx.hierarchy_mapper(&builder).map(&source_tc, &target_tc)?;
    Ok(MappingReport {
        source: source_tc.to_string(),
        target: target_tc.to_string(),
        mapping,
    })
}
