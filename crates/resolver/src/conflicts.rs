//! Version conflict detection over a fully expanded dependency graph
//!
//! A conflict is the same package name appearing at two different full
//! versions among the (transitive) dependencies of one node. Build
//! dependencies only contribute their runtime closure, and each
//! `multi_deps` alternative is checked on its own.

use crate::plan::BuildPlan;
use crate::resolver::{ResolveOptions, Resolver};
use crate::PlanEntry;
use hpcstack_errors::Error;
use hpcstack_events::{EventEmitter, EventSender, ResolverEvent};
use hpcstack_index::{EasyconfigSource, ModulesTool};
use hpcstack_types::{Dependency, EasyConfig, SpecKey};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Recognises "wrapper" records that only redirect to another module
#[derive(Clone, Debug)]
pub struct WrapperPolicy {
    pub easyblock: String,
}

impl Default for WrapperPolicy {
    fn default() -> Self {
        Self {
            easyblock: "ModuleRC".to_string(),
        }
    }
}

impl WrapperPolicy {
    #[must_use]
    pub fn new(easyblock: impl Into<String>) -> Self {
        Self {
            easyblock: easyblock.into(),
        }
    }

    /// The dependency a wrapper record stands for
    #[must_use]
    pub fn wrapped<'e>(&self, ec: &'e EasyConfig) -> Option<&'e Dependency> {
        if ec.easyblock.as_deref() != Some(self.easyblock.as_str()) {
            return None;
        }
        match ec.dependencies.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// One version clash
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Node whose dependency set holds both versions; `None` for the set of
    /// requested records as a whole
    pub parent: Option<SpecKey>,
    pub name: String,
    pub versions: (String, String),
    pub message: String,
}

/// Outcome of a conflict check
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub nodes: usize,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.conflicts.iter().map(|c| c.message.as_str()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct DepSets {
    build: BTreeSet<SpecKey>,
    runtime: BTreeSet<SpecKey>,
    multi: Vec<BTreeSet<SpecKey>>,
}

type Node = Option<SpecKey>;

/// Detects version conflicts across a set of requested records
pub struct ConflictChecker<'a> {
    source: &'a dyn EasyconfigSource,
    modules: &'a dyn ModulesTool,
    wrappers: WrapperPolicy,
    check_inter_ec_conflicts: bool,
    tx: Option<EventSender>,
}

impl<'a> ConflictChecker<'a> {
    #[must_use]
    pub fn new(source: &'a dyn EasyconfigSource, modules: &'a dyn ModulesTool) -> Self {
        Self {
            source,
            modules,
            wrappers: WrapperPolicy::default(),
            check_inter_ec_conflicts: true,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_wrapper_policy(mut self, wrappers: WrapperPolicy) -> Self {
        self.wrappers = wrappers;
        self
    }

    /// Also check the requested records against each other
    #[must_use]
    pub fn with_inter_ec_conflicts(mut self, enabled: bool) -> Self {
        self.check_inter_ec_conflicts = enabled;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    /// Resolve the full graph of `requested` and report version conflicts
    ///
    /// # Errors
    ///
    /// Returns an error if the dependency graph cannot be resolved.
    pub fn check(&self, requested: &[PlanEntry]) -> Result<ConflictReport, Error> {
        let plan = Resolver::new(self.source, self.modules)
            .with_options(ResolveOptions::retain_all())
            .with_event_sender(self.tx.clone())
            .resolve(requested)?;

        let roots: Vec<SpecKey> = requested
            .iter()
            .filter_map(|e| e.ec.as_ref())
            .map(EasyConfig::spec_key)
            .collect();
        let report = self.check_plan(&plan, &roots);

        self.emit_resolver(ResolverEvent::ConflictCheckCompleted {
            nodes: report.nodes,
            conflicts: report.conflicts.len(),
        });
        Ok(report)
    }

    /// Report conflicts in an already resolved (`retain_all`) plan
    #[must_use]
    pub fn check_plan(&self, plan: &BuildPlan, roots: &[SpecKey]) -> ConflictReport {
        let wrapped: BTreeMap<SpecKey, SpecKey> = plan
            .records()
            .filter_map(|ec| {
                self.wrappers
                    .wrapped(ec)
                    .map(|dep| (ec.spec_key(), dep.spec_key()))
            })
            .collect();
        let mut deps_for: BTreeMap<Node, DepSets> = BTreeMap::new();
        for ec in plan.records() {
            let key = ec.spec_key();
            if wrapped.contains_key(&key) {
                continue;
            }
            let alternatives = ec.multi_deps_len().unwrap_or(0);
            let sets = DepSets {
                build: dep_keys(&ec.builddependencies, &wrapped),
                runtime: dep_keys(&ec.dependencies, &wrapped),
                multi: (0..alternatives)
                    .map(|i| dep_keys(&ec.multi_deps_alternative(i), &wrapped))
                    .collect(),
            };
            deps_for.insert(Some(key), sets);
        }

        let mut dependents: BTreeMap<SpecKey, BTreeSet<SpecKey>> = BTreeMap::new();
        for (node, sets) in &deps_for {
            let Some(node) = node else { continue };
            for dep in sets.build.iter().chain(&sets.runtime).chain(sets.multi.iter().flatten()) {
                dependents.entry(dep.clone()).or_default().insert(node.clone());
            }
        }

        if self.check_inter_ec_conflicts {
            let runtime = roots
                .iter()
                .filter(|k| !wrapped.contains_key(*k))
                .cloned()
                .collect();
            deps_for.insert(
                None,
                DepSets {
                    runtime,
                    ..DepSets::default()
                },
            );
        }

        expand(&mut deps_for);

        let mut conflicts = Vec::new();
        let mut seen = BTreeSet::new();
        for (node, sets) in &deps_for {
            for conflict in node_conflicts(node.as_ref(), sets, &dependents) {
                let id = (
                    conflict.parent.clone(),
                    conflict.name.clone(),
                    conflict.versions.clone(),
                );
                if seen.insert(id) {
                    self.emit_resolver(ResolverEvent::ConflictDetected {
                        message: conflict.message.clone(),
                    });
                    conflicts.push(conflict);
                }
            }
        }

        ConflictReport {
            nodes: plan.len(),
            conflicts,
        }
    }
}

impl EventEmitter for ConflictChecker<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

/// Keys of non-external dependencies, wrappers replaced by what they wrap
fn dep_keys(deps: &[Dependency], wrapped: &BTreeMap<SpecKey, SpecKey>) -> BTreeSet<SpecKey> {
    deps.iter()
        .filter(|d| !d.external_module)
        .map(|d| {
            let key = d.spec_key();
            wrapped.get(&key).cloned().unwrap_or(key)
        })
        .collect()
}

/// Grow every node's sets with the runtime closure of their members until
/// nothing changes
fn expand(deps_for: &mut BTreeMap<Node, DepSets>) {
    loop {
        let snapshot = deps_for.clone();
        let runtime_of = |node: &Node, dep: &SpecKey| -> Option<&BTreeSet<SpecKey>> {
            if node.as_ref() == Some(dep) {
                return None;
            }
            snapshot.get(&Some(dep.clone())).map(|s| &s.runtime)
        };

        for (node, sets) in deps_for.iter_mut() {
            let closure = |set: &BTreeSet<SpecKey>| -> BTreeSet<SpecKey> {
                let mut out = set.clone();
                for dep in set {
                    if let Some(more) = runtime_of(node, dep) {
                        out.extend(more.iter().cloned());
                    }
                }
                out
            };
            sets.runtime = closure(&sets.runtime);
            sets.build = closure(&sets.build);
            sets.multi = sets.multi.iter().map(closure).collect();
        }

        if *deps_for == snapshot {
            return;
        }
    }
}

fn node_conflicts(
    node: Option<&SpecKey>,
    sets: &DepSets,
    dependents: &BTreeMap<SpecKey, BTreeSet<SpecKey>>,
) -> Vec<Conflict> {
    let variants: Vec<BTreeSet<&SpecKey>> = if sets.multi.is_empty() {
        vec![sets.runtime.iter().collect()]
    } else {
        sets.multi
            .iter()
            .map(|alt| sets.runtime.iter().chain(alt).collect())
            .collect()
    };

    let mut found = Vec::new();
    for runtime in variants {
        let mut by_name: BTreeMap<&str, BTreeSet<&SpecKey>> = BTreeMap::new();
        for key in sets.build.iter().chain(runtime).chain(node) {
            by_name.entry(key.name.as_str()).or_default().insert(key);
        }

        for keys in by_name.values().filter(|keys| keys.len() > 1) {
            let keys: Vec<&SpecKey> = keys.iter().copied().collect();
            for (i, first) in keys.iter().enumerate() {
                for second in &keys[i + 1..] {
                    let involves_self_build = [(*first, *second), (*second, *first)]
                        .iter()
                        .any(|(a, b)| Some(*a) == node && sets.build.contains(*b));
                    if involves_self_build {
                        continue;
                    }
                    found.push(conflict(node, first, second, dependents));
                }
            }
        }
    }
    found
}

fn conflict(
    node: Option<&SpecKey>,
    first: &SpecKey,
    second: &SpecKey,
    dependents: &BTreeMap<SpecKey, BTreeSet<SpecKey>>,
) -> Conflict {
    let describe = |key: &SpecKey| match dependents.get(key) {
        Some(parents) if !parents.is_empty() => {
            let parents: Vec<String> = parents.iter().map(ToString::to_string).collect();
            format!("{key} as dep of: {}", parents.join(", "))
        }
        _ => key.to_string(),
    };
    let detail = format!("{} vs {}", describe(first), describe(second));
    let message = match node {
        None => format!("Conflict between (dependencies of) easyconfigs: {detail}"),
        Some(parent) => format!("Conflict found for dependencies of {parent}: {detail}"),
    };

    Conflict {
        parent: node.cloned(),
        name: first.name.clone(),
        versions: (first.full_version.clone(), second.full_version.clone()),
        message,
    }
}
