//! Record rewriting for another toolchain

use crate::suffix::SuffixMapping;
use hpcstack_errors::Error;
use hpcstack_events::{EventEmitter, EventSender, TweakEvent};
use hpcstack_index::easyconfig_to_yaml;
use hpcstack_resolver::BuildPlan;
use hpcstack_toolchain::ToolchainMapping;
use hpcstack_types::{Dependency, EasyConfig, HierarchyEntry};
use serde::Serialize;

/// A record rewritten for the target toolchain
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TweakedRecord {
    /// Module name of the record it was derived from
    pub original: String,
    pub ec: EasyConfig,
}

impl TweakedRecord {
    /// `<name>-<full version>.eb`
    #[must_use]
    pub fn file_name(&self) -> String {
        self.ec.filename()
    }

    /// YAML form of the rewritten record
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(easyconfig_to_yaml(&self.ec)?)
    }
}

/// Applies a toolchain mapping and versionsuffix rules to records
pub struct Tweaker<'a> {
    mapping: &'a ToolchainMapping,
    suffixes: &'a SuffixMapping,
    tx: Option<EventSender>,
}

impl<'a> Tweaker<'a> {
    #[must_use]
    pub fn new(mapping: &'a ToolchainMapping, suffixes: &'a SuffixMapping) -> Self {
        Self {
            mapping,
            suffixes,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    /// Copy of `ec` targeting the mapped toolchains
    #[must_use]
    pub fn tweak_record(&self, ec: &EasyConfig) -> EasyConfig {
        let mut tweaked = ec.clone();
        if let Some(target) = self.mapping.map_toolchain(&ec.toolchain) {
            tweaked.toolchain = target;
        }
        if let Some(suffix) = self.rewrite_suffix(&ec.versionsuffix) {
            tweaked.versionsuffix = suffix;
        }
        for dep in tweaked
            .dependencies
            .iter_mut()
            .chain(tweaked.builddependencies.iter_mut())
        {
            self.tweak_dependency(dep);
        }
        tweaked
    }

    fn tweak_dependency(&self, dep: &mut Dependency) {
        if dep.external_module {
            return;
        }
        if let Some(paired) = self.mapping.carry_over_for(&dep.name) {
            if self
                .mapping
                .map_toolchain(&dep.toolchain)
                .is_some_and(|target| target.name == paired.toolchain.name)
            {
                dep.version.clone_from(&paired.version);
                dep.versionsuffix.clone_from(&paired.versionsuffix);
                dep.toolchain = paired.toolchain.clone();
                return;
            }
        }
        if let Some(target) = self.mapping.map_toolchain(&dep.toolchain) {
            dep.toolchain = target;
        }
        if let Some(suffix) = self.rewrite_suffix(&dep.versionsuffix) {
            dep.versionsuffix = suffix;
        }
    }

    /// `suffix` with the longest mapped part replaced, e.g. `-serial-Python-3.6.6`
    /// becomes `-serial-Python-3.7.2`
    fn rewrite_suffix(&self, suffix: &str) -> Option<String> {
        if suffix.is_empty() {
            return None;
        }
        if let Some(exact) = self.suffixes.get(suffix) {
            return Some(exact.clone());
        }
        self.suffixes
            .iter()
            .filter(|(from, _)| !from.is_empty() && suffix.contains(from.as_str()))
            .max_by_key(|(from, _)| from.len())
            .map(|(from, to)| suffix.replacen(from.as_str(), to, 1))
    }

    /// Whether the target toolchain already provides `ec` as a carried-over package
    fn is_carried_over(&self, ec: &EasyConfig) -> bool {
        self.mapping.carry_over_for(&ec.name).is_some_and(|paired| {
            self.mapping
                .map_toolchain(&ec.toolchain)
                .is_some_and(|target| target.name == paired.toolchain.name)
        })
    }

    /// Rewrite every record of `plan` except placeholders, the toolchains of
    /// the source hierarchy, and carried-over packages
    #[must_use]
    pub fn tweak_plan(&self, plan: &BuildPlan, source_hierarchy: &[HierarchyEntry]) -> Vec<TweakedRecord> {
        plan.records()
            .filter(|ec| !source_hierarchy.iter().any(|tc| tc.name == ec.name))
            .filter(|ec| !self.is_carried_over(ec))
            .map(|ec| {
                let tweaked = self.tweak_record(ec);
                self.emit_tweak(TweakEvent::RecordTweaked {
                    from: ec.full_mod_name(),
                    to: tweaked.full_mod_name(),
                });
                TweakedRecord {
                    original: ec.full_mod_name(),
                    ec: tweaked,
                }
            })
            .collect()
    }
}

impl EventEmitter for Tweaker<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}
