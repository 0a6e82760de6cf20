//! Toolchain hierarchy builder
//!
//! A hierarchy lists a toolchain together with all of its sub-toolchains,
//! ordered from the most basic one (usually `GCCcore`) up to the toolchain
//! itself. Sub-toolchain versions are not part of the definitions; they are
//! read from the dependencies declared in the toolchain easyconfigs.

use crate::registry::ToolchainRegistry;
use hpcstack_errors::{EasyconfigError, Error, ToolchainError};
use hpcstack_events::{EventEmitter, EventSender, ToolchainEvent};
use hpcstack_index::EasyconfigSource;
use hpcstack_types::{Dependency, EasyConfig, HierarchyEntry, ToolchainRef, SYSTEM_TOOLCHAIN_NAME};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Toolchain name and version, capabilities requested, system toolchain added
type CacheKey = (String, String, bool, bool);

/// Memoised hierarchies keyed by toolchain and the build switches
#[derive(Debug, Default)]
pub struct HierarchyCache {
    entries: RefCell<HashMap<CacheKey, Vec<HierarchyEntry>>>,
}

impl HierarchyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(toolchain: &ToolchainRef, incl_capabilities: bool, with_system: bool) -> CacheKey {
        (
            toolchain.name.clone(),
            toolchain.version.clone(),
            incl_capabilities,
            with_system,
        )
    }

    #[must_use]
    pub fn get(
        &self,
        toolchain: &ToolchainRef,
        incl_capabilities: bool,
        with_system: bool,
    ) -> Option<Vec<HierarchyEntry>> {
        self.entries
            .borrow()
            .get(&Self::key(toolchain, incl_capabilities, with_system))
            .cloned()
    }

    pub fn insert(
        &self,
        toolchain: &ToolchainRef,
        incl_capabilities: bool,
        with_system: bool,
        hierarchy: Vec<HierarchyEntry>,
    ) {
        self.entries
            .borrow_mut()
            .insert(Self::key(toolchain, incl_capabilities, with_system), hierarchy);
    }

    /// Drop every memoised hierarchy
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Builds toolchain hierarchies from the registry and toolchain easyconfigs
pub struct HierarchyBuilder<'a> {
    registry: &'a ToolchainRegistry,
    source: &'a dyn EasyconfigSource,
    cache: Option<&'a HierarchyCache>,
    add_system_to_minimal_toolchains: bool,
    tx: Option<EventSender>,
}

impl<'a> HierarchyBuilder<'a> {
    #[must_use]
    pub fn new(registry: &'a ToolchainRegistry, source: &'a dyn EasyconfigSource) -> Self {
        Self {
            registry,
            source,
            cache: None,
            add_system_to_minimal_toolchains: false,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: &'a HierarchyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Put `system` at the bottom of hierarchies whose base allows it
    #[must_use]
    pub fn with_system_toolchain(mut self, enabled: bool) -> Self {
        self.add_system_to_minimal_toolchains = enabled;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &'a ToolchainRegistry {
        self.registry
    }

    #[must_use]
    pub fn source(&self) -> &'a dyn EasyconfigSource {
        self.source
    }

    /// Hierarchy of `toolchain`, most basic entry first
    ///
    /// # Errors
    ///
    /// Returns an error if a toolchain is unknown, a toolchain or dependency
    /// easyconfig cannot be found, or a sub-toolchain version cannot be
    /// determined unambiguously.
    pub fn build(
        &self,
        toolchain: &ToolchainRef,
        incl_capabilities: bool,
    ) -> Result<Vec<HierarchyEntry>, Error> {
        if let Some(hierarchy) = self
            .cache
            .and_then(|cache| cache.get(toolchain, incl_capabilities, self.add_system_to_minimal_toolchains))
        {
            self.emit_built(toolchain, &hierarchy, true);
            return Ok(hierarchy);
        }

        let refs = self.walk(toolchain)?;
        let mut hierarchy = Vec::with_capacity(refs.len());
        for tc in refs {
            let entry = HierarchyEntry::new(tc.name.clone(), tc.version.clone());
            hierarchy.push(if incl_capabilities {
                entry.with_capabilities(self.registry.capabilities(&tc.name)?)
            } else {
                entry
            });
        }

        tracing::debug!(toolchain = %toolchain, levels = hierarchy.len(), "built toolchain hierarchy");
        if let Some(cache) = self.cache {
            cache.insert(
                toolchain,
                incl_capabilities,
                self.add_system_to_minimal_toolchains,
                hierarchy.clone(),
            );
        }
        self.emit_built(toolchain, &hierarchy, false);
        Ok(hierarchy)
    }

    fn emit_built(&self, toolchain: &ToolchainRef, hierarchy: &[HierarchyEntry], cached: bool) {
        self.emit_toolchain(ToolchainEvent::HierarchyBuilt {
            toolchain: toolchain.to_string(),
            hierarchy: hierarchy.iter().map(ToString::to_string).collect(),
            cached,
        });
    }

    /// Breadth-first walk over sub-toolchains; each one found is put in front
    fn walk(&self, parent: &ToolchainRef) -> Result<VecDeque<ToolchainRef>, Error> {
        self.registry.get(&parent.name)?;

        let mut hierarchy = VecDeque::from([parent.clone()]);
        let mut queue = VecDeque::from([parent.clone()]);
        let mut visited: HashSet<String> = HashSet::from([parent.name.clone()]);

        while let Some(current) = queue.pop_back() {
            let definition = self.registry.get(&current.name)?;
            if definition.subtoolchains.is_empty() || current.is_system() {
                continue;
            }

            let candidates = self.version_candidates(&current, &definition.subtoolchains)?;

            for sub in &definition.subtoolchains {
                let Some(version) = self.subtoolchain_version(&current, sub, &candidates)? else {
                    continue;
                };
                if visited.insert(sub.clone()) {
                    let tc = ToolchainRef::new(sub, version);
                    hierarchy.push_front(tc.clone());
                    queue.push_front(tc);
                }
            }
        }
        Ok(hierarchy)
    }

    fn subtoolchain_version(
        &self,
        current: &ToolchainRef,
        sub: &str,
        candidates: &[(String, String)],
    ) -> Result<Option<String>, Error> {
        if sub == SYSTEM_TOOLCHAIN_NAME {
            return Ok(self.add_system_to_minimal_toolchains.then(String::new));
        }

        let versions: BTreeSet<&str> = candidates
            .iter()
            .filter(|(name, _)| name == sub)
            .map(|(_, version)| version.as_str())
            .collect();

        let optional = self.registry.get(sub)?.optional;
        match versions.len() {
            1 => Ok(versions.first().map(|v| (*v).to_string())),
            0 if optional => Ok(None),
            0 => Err(ToolchainError::SubtoolchainVersionNotFound {
                toolchain: current.to_string(),
                subtoolchain: sub.to_string(),
            }
            .into()),
            _ => Err(ToolchainError::AmbiguousSubtoolchainVersion {
                toolchain: current.to_string(),
                subtoolchain: sub.to_string(),
                versions: versions.into_iter().map(ToString::to_string).collect(),
            }
            .into()),
        }
    }

    /// `(name, version)` pairs named by the toolchain easyconfig: its
    /// dependencies and their toolchains, one level further down as well
    fn version_candidates(
        &self,
        current: &ToolchainRef,
        subtoolchains: &[String],
    ) -> Result<Vec<(String, String)>, Error> {
        let ec = self.load(&current.name, &current.version)?;
        let mut candidates = Vec::new();

        for dep in deps_of(&ec) {
            push_candidates(&mut candidates, dep);
            let dep_ec = self.load(&dep.name, &dep.full_version())?;
            for depdep in deps_of(&dep_ec) {
                push_candidates(&mut candidates, depdep);
            }
        }

        // composite sub-toolchains usually share the release name of the parent
        for sub in subtoolchains {
            if sub == SYSTEM_TOOLCHAIN_NAME || !self.registry.get(sub)?.is_composite() {
                continue;
            }
            if self.source.find_easyconfig(sub, &current.version)?.is_some() {
                candidates.push((sub.clone(), current.version.clone()));
            }
        }

        candidates.retain(|(name, _)| subtoolchains.contains(name));
        Ok(candidates)
    }

    fn load(&self, name: &str, full_version: &str) -> Result<EasyConfig, Error> {
        let path = self
            .source
            .find_easyconfig(name, full_version)?
            .ok_or_else(|| EasyconfigError::NotFound {
                name: name.to_string(),
                version: full_version.to_string(),
            })?;
        self.source.parse_easyconfig(&path)
    }
}

impl EventEmitter for HierarchyBuilder<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

fn deps_of(ec: &EasyConfig) -> impl Iterator<Item = &Dependency> {
    ec.dependencies
        .iter()
        .chain(&ec.builddependencies)
        .filter(|d| !d.external_module)
}

fn push_candidates(candidates: &mut Vec<(String, String)>, dep: &Dependency) {
    candidates.push((
        dep.name.clone(),
        format!("{}{}", dep.version, dep.versionsuffix),
    ));
    candidates.push((dep.toolchain.name.clone(), dep.toolchain.version.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcstack_index::MemorySource;

    fn sys(name: &str, version: &str, deps: Vec<Dependency>) -> EasyConfig {
        let mut ec = EasyConfig::new(name, version, ToolchainRef::system());
        ec.dependencies = deps;
        ec
    }

    fn gcc_stack() -> MemorySource {
        let gcccore = ToolchainRef::new("GCCcore", "7.3.0");
        MemorySource::new()
            .with(sys("GCCcore", "7.3.0", vec![]))
            .with(EasyConfig::new("binutils", "2.30", gcccore.clone()))
            .with(sys(
                "GCC",
                "7.3.0-2.30",
                vec![
                    Dependency::new("GCCcore", "7.3.0", ToolchainRef::system()),
                    Dependency::new("binutils", "2.30", gcccore),
                ],
            ))
    }

    #[test]
    fn test_system_toolchain_hierarchy() {
        let registry = ToolchainRegistry::builtin();
        let source = MemorySource::new();
        let hierarchy = HierarchyBuilder::new(&registry, &source)
            .build(&ToolchainRef::system(), true)
            .unwrap();
        assert_eq!(hierarchy, vec![HierarchyEntry::new("system", "")]);
    }

    #[test]
    fn test_gcc_hierarchy_with_and_without_system() {
        let registry = ToolchainRegistry::builtin();
        let source = gcc_stack();
        let gcc = ToolchainRef::new("GCC", "7.3.0-2.30");

        let names = |h: Vec<HierarchyEntry>| h.into_iter().map(|e| e.to_string()).collect::<Vec<_>>();

        let plain = HierarchyBuilder::new(&registry, &source).build(&gcc, false).unwrap();
        assert_eq!(names(plain), vec!["GCCcore/7.3.0", "GCC/7.3.0-2.30"]);

        let with_system = HierarchyBuilder::new(&registry, &source)
            .with_system_toolchain(true)
            .build(&gcc, true)
            .unwrap();
        assert_eq!(with_system[0].name, "system");
        assert_eq!(with_system[1].comp_family.as_deref(), Some("GCC"));
        assert_eq!(with_system.len(), 3);
    }

    #[test]
    fn test_cache_serves_repeated_builds() {
        let registry = ToolchainRegistry::builtin();
        let source = gcc_stack();
        let cache = HierarchyCache::new();
        let builder = HierarchyBuilder::new(&registry, &source).with_cache(&cache);
        let gcc = ToolchainRef::new("GCC", "7.3.0-2.30");

        let first = builder.build(&gcc, true).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(builder.build(&gcc, true).unwrap(), first);
        builder.build(&gcc, false).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_separates_system_setting() {
        let registry = ToolchainRegistry::builtin();
        let source = gcc_stack();
        let cache = HierarchyCache::new();
        let gcc = ToolchainRef::new("GCC", "7.3.0-2.30");

        let plain = HierarchyBuilder::new(&registry, &source)
            .with_cache(&cache)
            .build(&gcc, false)
            .unwrap();
        let with_system = HierarchyBuilder::new(&registry, &source)
            .with_cache(&cache)
            .with_system_toolchain(true)
            .build(&gcc, false)
            .unwrap();

        assert_eq!(plain.len(), 2);
        assert_eq!(with_system.len(), 3);
        assert_eq!(with_system[0].name, "system");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_missing_and_ambiguous_subtoolchain_versions() {
        let registry = ToolchainRegistry::builtin();

        let source = MemorySource::new().with(sys("gompi", "2018b", vec![]));
        let err = HierarchyBuilder::new(&registry, &source)
            .build(&ToolchainRef::new("gompi", "2018b"), false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Toolchain(ToolchainError::SubtoolchainVersionNotFound { ref subtoolchain, .. }) if subtoolchain == "GCC"
        ));

        let source = MemorySource::new()
            .with(sys(
                "gompi",
                "2018b",
                vec![
                    Dependency::new("GCC", "7.3.0-2.30", ToolchainRef::system()),
                    Dependency::new("GCC", "8.2.0-2.31.1", ToolchainRef::system()),
                ],
            ))
            .with(sys("GCC", "7.3.0-2.30", vec![]))
            .with(sys("GCC", "8.2.0-2.31.1", vec![]));
        let err = HierarchyBuilder::new(&registry, &source)
            .build(&ToolchainRef::new("gompi", "2018b"), false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Toolchain(ToolchainError::AmbiguousSubtoolchainVersion { ref versions, .. })
                if versions.len() == 2
        ));
    }

    #[test]
    fn test_unknown_toolchain_and_missing_easyconfig() {
        let registry = ToolchainRegistry::builtin();
        let source = MemorySource::new();
        let builder = HierarchyBuilder::new(&registry, &source);

        assert!(matches!(
            builder.build(&ToolchainRef::new("nosuchtc", "1.0"), false).unwrap_err(),
            Error::Config(_)
        ));
        assert!(matches!(
            builder.build(&ToolchainRef::new("GCC", "7.3.0-2.30"), false).unwrap_err(),
            Error::Easyconfig(EasyconfigError::NotFound { .. })
        ));
    }
}
