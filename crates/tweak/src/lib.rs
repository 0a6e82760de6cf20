#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Version selection and easyconfig tweaking for hpcstack
//!
//! Picks versions among candidates, derives versionsuffix rewrites between
//! toolchains, produces in-memory copies of easyconfigs that target another
//! toolchain, and selects or generates an easyconfig for a software request.

mod candidates;
mod obtain;
mod select;
mod suffix;
mod tweak;

pub use candidates::{available_versions, easyconfigs_with_toolchain};
pub use obtain::{EasyconfigRequest, ObtainedEasyconfig, Obtainer};
pub use select::pick_version;
pub use suffix::{SuffixMapper, SuffixMapping, VersionSuffixCache};
pub use tweak::{TweakedRecord, Tweaker};

use hpcstack_errors::Error;
use hpcstack_resolver::BuildPlan;
use hpcstack_toolchain::{HierarchyBuilder, ToolchainMapping};
use hpcstack_types::{EasyConfig, HierarchyEntry, ToolchainRef};

/// Versionsuffix rewrites for `software` when moving away from `source_tc`
///
/// # Errors
///
/// Returns an error if the mapping cannot be derived or is not unique.
pub fn map_common_versionsuffixes(
    software: &str,
    source_tc: &ToolchainRef,
    mapping: &ToolchainMapping,
    builder: &HierarchyBuilder<'_>,
    cache: Option<&VersionSuffixCache>,
) -> Result<SuffixMapping, Error> {
    let mapper = SuffixMapper::new(builder);
    match cache {
        Some(cache) => mapper.with_cache(cache),
        None => mapper,
    }
    .map_common_versionsuffixes(software, source_tc, mapping)
}

/// Copy of `ec` targeting the mapped toolchains
#[must_use]
pub fn tweak_record(ec: &EasyConfig, mapping: &ToolchainMapping, suffixes: &SuffixMapping) -> EasyConfig {
    Tweaker::new(mapping, suffixes).tweak_record(ec)
}

/// Rewrite every non-toolchain record of `plan`
#[must_use]
pub fn tweak_plan(
    plan: &BuildPlan,
    source_hierarchy: &[HierarchyEntry],
    mapping: &ToolchainMapping,
    suffixes: &SuffixMapping,
) -> Vec<TweakedRecord> {
    Tweaker::new(mapping, suffixes).tweak_plan(plan, source_hierarchy)
}
