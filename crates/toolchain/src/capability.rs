//! Capability mapper

use hpcstack_types::HierarchyEntry;

/// Whether `target` offers every capability `source` provides
///
/// This is a partial order: two entries can each lack something the other
/// provides.
#[must_use]
pub fn can_substitute(source: &HierarchyEntry, target: &HierarchyEntry) -> bool {
    source
        .capabilities
        .provided()
        .all(|cap| target.capabilities.get(cap).is_some())
}
