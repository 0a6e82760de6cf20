//! Versionsuffix mapping between toolchains
//!
//! Versionsuffixes often name the version of a companion package, for
//! example `-Python-3.6.6`. When moving to another toolchain the suffix has
//! to follow the version of that package available with the new toolchain.

use crate::candidates::available_versions;
use hpcstack_errors::{Error, ToolchainError};
use hpcstack_events::{EventEmitter, EventSender, TweakEvent};
use hpcstack_toolchain::{HierarchyBuilder, ToolchainMapping};
use hpcstack_types::ToolchainRef;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Versionsuffix rewrite rules, `-<software>-<ver>` to `-<software>-<ver>`
pub type SuffixMapping = BTreeMap<String, String>;

type CacheKey = (String, ToolchainRef, Vec<ToolchainRef>);

/// Memoised versionsuffix mappings
#[derive(Debug, Default)]
pub struct VersionSuffixCache {
    entries: RefCell<HashMap<CacheKey, SuffixMapping>>,
}

impl VersionSuffixCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(software: &str, source_tc: &ToolchainRef, mapping: &ToolchainMapping) -> CacheKey {
        (
            software.to_string(),
            source_tc.clone(),
            mapping.toolchains.values().cloned().collect(),
        )
    }

    /// Drop every memoised mapping
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

/// Derives versionsuffix mappings from the easyconfigs on the robot path
pub struct SuffixMapper<'a> {
    builder: &'a HierarchyBuilder<'a>,
    cache: Option<&'a VersionSuffixCache>,
    tx: Option<EventSender>,
}

impl<'a> SuffixMapper<'a> {
    #[must_use]
    pub fn new(builder: &'a HierarchyBuilder<'a>) -> Self {
        Self {
            builder,
            cache: None,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: &'a VersionSuffixCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    /// Map each `-<software>-<version>` built with a toolchain of the
    /// `source_tc` hierarchy onto the most recent version of the same major
    /// release available with the mapped toolchain
    ///
    /// # Errors
    ///
    /// Returns an error if the hierarchy cannot be built, a candidate cannot
    /// be parsed, or one suffix would map onto two different suffixes.
    pub fn map_common_versionsuffixes(
        &self,
        software: &str,
        source_tc: &ToolchainRef,
        mapping: &ToolchainMapping,
    ) -> Result<SuffixMapping, Error> {
        let key = VersionSuffixCache::key(software, source_tc, mapping);
        if let Some(cached) = self
            .cache
            .and_then(|cache| cache.entries.borrow().get(&key).cloned())
        {
            return Ok(cached);
        }

        let source = self.builder.source();
        let mut suffixes = SuffixMapping::new();

        for entry in self.builder.build(source_tc, false)? {
            let toolchain = entry.toolchain();
            let Some(target_tc) = mapping.map_toolchain(&toolchain) else {
                continue;
            };
            let versions = available_versions(source, software, &toolchain)?;
            if versions.is_empty() {
                continue;
            }
            let target_versions = available_versions(source, software, &target_tc)?;

            for version in &versions {
                let Some(best) = target_versions
                    .iter()
                    .filter(|v| v.major() == version.major())
                    .max()
                else {
                    tracing::debug!(software, %version, target = %target_tc, "no version with the same major release");
                    continue;
                };

                let from = format!("-{software}-{version}");
                let to = format!("-{software}-{best}");
                match suffixes.get(&from) {
                    Some(existing) if *existing != to => {
                        return Err(ToolchainError::NonUniqueSuffixMapping {
                            software: software.to_string(),
                            suffix: from,
                            candidates: vec![existing.clone(), to],
                        }
                        .into());
                    }
                    Some(_) => {}
                    None => {
                        self.emit_tweak(TweakEvent::SuffixMapped {
                            from: from.clone(),
                            to: to.clone(),
                        });
                        suffixes.insert(from, to);
                    }
                }
            }
        }

        if let Some(cache) = self.cache {
            cache.entries.borrow_mut().insert(key, suffixes.clone());
        }
        Ok(suffixes)
    }
}

impl EventEmitter for SuffixMapper<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcstack_index::MemorySource;
    use hpcstack_toolchain::ToolchainRegistry;
    use hpcstack_types::{Dependency, EasyConfig};

    fn source() -> MemorySource {
        let system = ToolchainRef::system();
        let gcc7 = ToolchainRef::new("GCC", "7.3.0-2.30");
        let gcc8 = ToolchainRef::new("GCC", "8.2.0-2.31.1");
        let mut gcc7_ec = EasyConfig::new("GCC", "7.3.0-2.30", system.clone());
        gcc7_ec
            .dependencies
            .push(Dependency::new("GCCcore", "7.3.0", system.clone()));
        let mut gcc8_ec = EasyConfig::new("GCC", "8.2.0-2.31.1", system.clone());
        gcc8_ec
            .dependencies
            .push(Dependency::new("GCCcore", "8.2.0", system.clone()));

        MemorySource::new()
            .with(EasyConfig::new("GCCcore", "7.3.0", system.clone()))
            .with(EasyConfig::new("GCCcore", "8.2.0", system))
            .with(gcc7_ec)
            .with(gcc8_ec)
            .with(EasyConfig::new("Python", "2.7.15", gcc7.clone()))
            .with(EasyConfig::new("Python", "3.6.6", gcc7))
            .with(EasyConfig::new("Python", "2.7.15", gcc8.clone()))
            .with(EasyConfig::new("Python", "2.7.16", gcc8.clone()))
            .with(EasyConfig::new("Python", "3.7.2", gcc8))
    }

    fn mapping() -> ToolchainMapping {
        ToolchainMapping {
            toolchains: [
                ("GCCcore".to_string(), ToolchainRef::new("GCCcore", "8.2.0")),
                ("GCC".to_string(), ToolchainRef::new("GCC", "8.2.0-2.31.1")),
            ]
            .into(),
            carry_over: BTreeMap::new(),
        }
    }

    #[test]
    fn test_majors_map_onto_latest() {
        let registry = ToolchainRegistry::builtin();
        let source = source();
        let builder = HierarchyBuilder::new(&registry, &source);
        let cache = VersionSuffixCache::new();
        let mapper = SuffixMapper::new(&builder).with_cache(&cache);
        let gcc7 = ToolchainRef::new("GCC", "7.3.0-2.30");

        let suffixes = mapper
            .map_common_versionsuffixes("Python", &gcc7, &mapping())
            .unwrap();
        assert_eq!(
            suffixes,
            SuffixMapping::from([
                ("-Python-2.7.15".to_string(), "-Python-2.7.16".to_string()),
                ("-Python-3.6.6".to_string(), "-Python-3.7.2".to_string()),
            ])
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(
            mapper
                .map_common_versionsuffixes("Python", &gcc7, &mapping())
                .unwrap(),
            suffixes
        );
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_software_maps_nothing() {
        let registry = ToolchainRegistry::builtin();
        let source = source();
        let builder = HierarchyBuilder::new(&registry, &source);
        let suffixes = SuffixMapper::new(&builder)
            .map_common_versionsuffixes("Perl", &ToolchainRef::new("GCC", "7.3.0-2.30"), &mapping())
            .unwrap();
        assert!(suffixes.is_empty());
    }
}
