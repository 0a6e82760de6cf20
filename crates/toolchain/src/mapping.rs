//! Toolchain hierarchy mapper
//!
//! Maps every level of a source toolchain hierarchy onto the least capable
//! level of a target hierarchy that can stand in for it.

use crate::capability::can_substitute;
use crate::hierarchy::HierarchyBuilder;
use hpcstack_config::constants::{DEFAULT_BASE_TOOLCHAIN, DEFAULT_CARRY_OVER_PACKAGE};
use hpcstack_config::CarryOverConfig;
use hpcstack_errors::{EasyconfigError, Error, ToolchainError};
use hpcstack_events::{EventEmitter, EventSender, ToolchainEvent};
use hpcstack_index::ModulesTool;
use hpcstack_resolver::{PlanEntry, ResolveOptions, Resolver};
use hpcstack_types::{EasyConfig, HierarchyEntry, ToolchainRef};
use serde::Serialize;
use std::collections::BTreeMap;

/// Version of a carried-over dependency in the target toolchain
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionOverride {
    pub version: String,
    pub versionsuffix: String,
    /// Base toolchain of the target hierarchy the dependency is built with
    pub toolchain: ToolchainRef,
}

/// Rewrite rules from a source toolchain to a target toolchain
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ToolchainMapping {
    /// Source toolchain name to target toolchain
    pub toolchains: BTreeMap<String, ToolchainRef>,
    /// Package name to the version to use with the target toolchain
    pub carry_over: BTreeMap<String, VersionOverride>,
}

impl ToolchainMapping {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolchainRef> {
        self.toolchains.get(name)
    }

    /// Target for `toolchain`, or `None` if it is not part of the source hierarchy
    #[must_use]
    pub fn map_toolchain(&self, toolchain: &ToolchainRef) -> Option<ToolchainRef> {
        self.toolchains.get(&toolchain.name).cloned()
    }

    #[must_use]
    pub fn carry_over_for(&self, package: &str) -> Option<&VersionOverride> {
        self.carry_over.get(package)
    }
}

/// A dependency paired 1:1 with the base compiler toolchain (binutils with
/// GCCcore) that keeps the target's version instead of being remapped
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairedDependencyPolicy {
    pub package: String,
    pub base_toolchain: String,
}

impl Default for PairedDependencyPolicy {
    fn default() -> Self {
        Self {
            package: DEFAULT_CARRY_OVER_PACKAGE.to_string(),
            base_toolchain: DEFAULT_BASE_TOOLCHAIN.to_string(),
        }
    }
}

impl PairedDependencyPolicy {
    /// Policy from configuration; `None` when carry-over is disabled
    #[must_use]
    pub fn from_config(config: &CarryOverConfig) -> Option<Self> {
        config.enabled.then(|| Self {
            package: config.package.clone(),
            base_toolchain: config.base_toolchain.clone(),
        })
    }
}

/// First target entry able to stand in for `source`
///
/// The bare base compiler toolchain is only picked for the base toolchain
/// itself.
#[must_use]
pub fn select_target<'t>(
    source: &HierarchyEntry,
    target: &'t [HierarchyEntry],
    base_toolchain: &str,
) -> Option<&'t HierarchyEntry> {
    target.iter().find(|candidate| {
        can_substitute(source, candidate)
            && (candidate.name != base_toolchain || source.name == base_toolchain)
    })
}

/// Whether a paired dependency has to be carried over between two
/// hierarchies: both contain the base toolchain and neither is the base
/// toolchain itself
///
/// Hierarchies end with the toolchain they were built for.
#[must_use]
pub fn needs_carry_over(base_toolchain: &str, source: &[HierarchyEntry], target: &[HierarchyEntry]) -> bool {
    let is_above_base = |h: &[HierarchyEntry]| {
        h.last().is_some_and(|top| top.name != base_toolchain) && h.iter().any(|e| e.name == base_toolchain)
    };
    is_above_base(source) && is_above_base(target)
}

/// Map each source entry onto a target entry
///
/// # Errors
///
/// Returns an error naming the source entry and the target hierarchy when
/// no target entry can substitute it.
pub fn map_hierarchies<E: EventEmitter + ?Sized>(
    source: &[HierarchyEntry],
    target: &[HierarchyEntry],
    base_toolchain: &str,
    events: &E,
) -> Result<BTreeMap<String, ToolchainRef>, Error> {
    let mut mapping = BTreeMap::new();

    for entry in source {
        let selected = select_target(entry, target, base_toolchain).ok_or_else(|| {
            ToolchainError::NoPossibleMapping {
                source_toolchain: entry.to_string(),
                target_hierarchy: target.iter().map(ToString::to_string).collect(),
            }
        })?;

        events.emit_toolchain(ToolchainEvent::MappingSelected {
            source: entry.to_string(),
            target: selected.to_string(),
        });
        if let (Some(from), Some(to)) = (&entry.comp_family, &selected.comp_family) {
            if from != to {
                events.emit_toolchain(ToolchainEvent::CompilerFamilySwitch {
                    source: entry.to_string(),
                    target: selected.to_string(),
                    from_family: from.clone(),
                    to_family: to.clone(),
                });
            }
        }
        mapping.insert(entry.name.clone(), selected.toolchain());
    }
    Ok(mapping)
}

/// Computes toolchain mappings, including carried-over dependencies
pub struct HierarchyMapper<'a> {
    builder: &'a HierarchyBuilder<'a>,
    modules: &'a dyn ModulesTool,
    carry_over: Option<PairedDependencyPolicy>,
    base_toolchain: String,
    tx: Option<EventSender>,
}

impl<'a> HierarchyMapper<'a> {
    #[must_use]
    pub fn new(builder: &'a HierarchyBuilder<'a>, modules: &'a dyn ModulesTool) -> Self {
        Self {
            builder,
            modules,
            carry_over: Some(PairedDependencyPolicy::default()),
            base_toolchain: DEFAULT_BASE_TOOLCHAIN.to_string(),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_carry_over(mut self, policy: Option<PairedDependencyPolicy>) -> Self {
        if let Some(policy) = &policy {
            self.base_toolchain.clone_from(&policy.base_toolchain);
        }
        self.carry_over = policy;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    /// Mapping from every level of `source`'s hierarchy onto `target`'s
    ///
    /// # Errors
    ///
    /// Returns an error if either hierarchy cannot be built, some source
    /// level has no substitute, or the carried-over dependency cannot be
    /// located uniquely in the target toolchain.
    pub fn map(&self, source: &ToolchainRef, target: &ToolchainRef) -> Result<ToolchainMapping, Error> {
        let source_hierarchy = self.builder.build(source, true)?;
        let target_hierarchy = self.builder.build(target, true)?;

        let toolchains = map_hierarchies(
            &source_hierarchy,
            &target_hierarchy,
            &self.base_toolchain,
            &self.tx,
        )?;
        let mut mapping = ToolchainMapping {
            toolchains,
            carry_over: BTreeMap::new(),
        };

        if let Some(policy) = &self.carry_over {
            if needs_carry_over(&policy.base_toolchain, &source_hierarchy, &target_hierarchy) {
                if let Some(version) = self.carried_over(policy, source, target)? {
                    self.emit_toolchain(ToolchainEvent::CarryOver {
                        package: policy.package.clone(),
                        version: version.version.clone(),
                        versionsuffix: version.versionsuffix.clone(),
                    });
                    mapping.carry_over.insert(policy.package.clone(), version);
                }
            }
        }
        Ok(mapping)
    }

    fn carried_over(
        &self,
        policy: &PairedDependencyPolicy,
        source: &ToolchainRef,
        target: &ToolchainRef,
    ) -> Result<Option<VersionOverride>, Error> {
        let source_tree = self.dependency_tree(source)?;
        if !source_tree.iter().any(|ec| ec.name == policy.package) {
            return Ok(None);
        }

        let target_tree = self.dependency_tree(target)?;
        let found: Vec<&EasyConfig> = target_tree
            .iter()
            .filter(|ec| ec.name == policy.package && ec.toolchain.name == policy.base_toolchain)
            .collect();
        match found.as_slice() {
            [only] => Ok(Some(VersionOverride {
                version: only.version.clone(),
                versionsuffix: only.versionsuffix.clone(),
                toolchain: only.toolchain.clone(),
            })),
            _ => Err(ToolchainError::MissingCarryOver {
                package: policy.package.clone(),
                base_toolchain: policy.base_toolchain.clone(),
                toolchain: target.to_string(),
                found: found.len(),
            }
            .into()),
        }
    }

    /// Every record needed to build `toolchain`, itself included
    fn dependency_tree(&self, toolchain: &ToolchainRef) -> Result<Vec<EasyConfig>, Error> {
        if toolchain.is_system() {
            return Ok(Vec::new());
        }
        let source = self.builder.source();
        let path = source
            .find_easyconfig(&toolchain.name, &toolchain.version)?
            .ok_or_else(|| EasyconfigError::NotFound {
                name: toolchain.name.clone(),
                version: toolchain.version.clone(),
            })?;
        let ec = source.parse_easyconfig(&path)?;

        let plan = Resolver::new(source, self.modules)
            .with_options(ResolveOptions::retain_all())
            .with_event_sender(self.tx.clone())
            .resolve(&[PlanEntry::new(ec, Some(path))])?;
        Ok(plan.records().cloned().collect())
    }
}

impl EventEmitter for HierarchyMapper<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}
