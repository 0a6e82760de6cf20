//! Robot dependency resolver
//!
//! Orders a batch of easyconfigs so that every record follows the records
//! providing its dependencies. Dependencies already satisfied by installed
//! modules are dropped; the rest are looked up through an
//! [`EasyconfigSource`] and pulled into the batch.

use crate::plan::{BuildPlan, PlanEntry};
use hpcstack_errors::{EasyconfigError, Error, ResolveError};
use hpcstack_events::{EventEmitter, EventSender, ResolverEvent};
use hpcstack_index::{EasyconfigSource, ModulesTool, StaticModules};
use hpcstack_types::Dependency;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Upper bound on outer resolution rounds
pub const MAX_RESOLVE_ITERATIONS: usize = 10_000;

/// Resolution switches
#[derive(Clone, Copy, Debug)]
pub struct ResolveOptions {
    /// Look up easyconfigs for unresolved dependencies
    pub robot: bool,
    /// Ignore installed modules so the full graph ends up in the plan
    pub retain_all: bool,
    /// Accept dependencies with an installed module but no easyconfig
    pub tolerate_missing_easyconfigs: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            robot: true,
            retain_all: false,
            tolerate_missing_easyconfigs: false,
        }
    }
}

impl ResolveOptions {
    /// Options for walking the complete dependency graph
    #[must_use]
    pub fn retain_all() -> Self {
        Self {
            robot: true,
            retain_all: true,
            tolerate_missing_easyconfigs: true,
        }
    }
}

/// A record still waiting for some of its dependencies
#[derive(Debug)]
struct Pending {
    entry: PlanEntry,
    unresolved: Vec<Dependency>,
}

impl Pending {
    fn new(entry: PlanEntry) -> Self {
        let unresolved = entry.dependencies.clone();
        Self { entry, unresolved }
    }

    /// Drop a dependency that cannot be provided by any record
    fn strip(&mut self, dep: &Dependency) {
        self.unresolved.retain(|d| d != dep);
        self.entry.dependencies.retain(|d| d != dep);
    }
}

/// Dependency resolver
pub struct Resolver<'a> {
    source: &'a dyn EasyconfigSource,
    modules: &'a dyn ModulesTool,
    options: ResolveOptions,
    tx: Option<EventSender>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver with default options
    #[must_use]
    pub fn new(source: &'a dyn EasyconfigSource, modules: &'a dyn ModulesTool) -> Self {
        Self {
            source,
            modules,
            options: ResolveOptions::default(),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    #[must_use]
    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    #[must_use]
    pub fn source(&self) -> &'a dyn EasyconfigSource {
        self.source
    }

    /// Order `requested` and every record needed to build it
    ///
    /// # Errors
    ///
    /// Fails when dependencies are irresolvable, when external modules are
    /// missing, when a robot-found easyconfig provides a different module
    /// than asked for, or when the remaining records depend on each other.
    pub fn resolve(&self, requested: &[PlanEntry]) -> Result<BuildPlan, Error> {
        self.emit_resolver(ResolverEvent::ResolutionStarted {
            requested: requested.iter().map(|e| e.full_mod_name.clone()).collect(),
            robot_enabled: self.options.robot,
            retain_all: self.options.retain_all,
        });

        let installed = StaticModules::new(self.modules.available()?);
        let mut available: BTreeSet<String> = if self.options.retain_all {
            BTreeSet::new()
        } else {
            installed.available()?
        };
        for entry in requested {
            available.remove(&entry.full_mod_name);
        }

        let mut worklist: Vec<Pending> = requested.iter().cloned().map(Pending::new).collect();
        let mut plan = BuildPlan::new();
        let mut missing_easyconfigs: Vec<String> = Vec::new();
        let mut totally_missing: Vec<String> = Vec::new();
        let mut rounds = 0;

        while !worklist.is_empty() {
            rounds += 1;
            if rounds > MAX_RESOLVE_ITERATIONS {
                return Err(ResolveError::LoopLimitExceeded {
                    limit: MAX_RESOLVE_ITERATIONS,
                }
                .into());
            }

            let mut progressed = self.sweep(&installed, &mut worklist, &mut available, &mut plan)?;

            let missing_external: Vec<String> = worklist
                .iter()
                .flat_map(|p| p.unresolved.iter())
                .filter(|d| d.external_module)
                .map(Dependency::full_mod_name)
                .collect();
            if !missing_external.is_empty() {
                return Err(ResolveError::MissingExternalModules {
                    modules: missing_external,
                }
                .into());
            }

            if worklist.is_empty() {
                break;
            }

            if !self.options.robot {
                let missing: Vec<String> = worklist
                    .iter()
                    .flat_map(|p| p.unresolved.iter())
                    .map(Dependency::full_mod_name)
                    .collect();
                return Err(ResolveError::Irresolvable {
                    missing: dedup(missing),
                }
                .into());
            }

            progressed |= self.robot_round(
                &installed,
                &mut worklist,
                &mut available,
                &mut plan,
                &mut missing_easyconfigs,
                &mut totally_missing,
            )?;

            if !progressed {
                return Err(ResolveError::DependencyCycle {
                    modules: worklist
                        .iter()
                        .map(|p| p.entry.full_mod_name.clone())
                        .collect(),
                }
                .into());
            }
        }

        let mut irresolvable = totally_missing;
        if !self.options.tolerate_missing_easyconfigs {
            irresolvable.extend(missing_easyconfigs);
        }
        if !irresolvable.is_empty() {
            return Err(ResolveError::Irresolvable {
                missing: dedup(irresolvable),
            }
            .into());
        }

        self.emit_resolver(ResolverEvent::ResolutionCompleted {
            planned: plan.len(),
            placeholders: plan.placeholder_count(),
        });
        Ok(plan)
    }

    /// Move every record whose dependencies are all satisfied into the plan,
    /// repeating while records keep resolving
    fn sweep(
        &self,
        installed: &StaticModules,
        worklist: &mut Vec<Pending>,
        available: &mut BTreeSet<String>,
        plan: &mut BuildPlan,
    ) -> Result<bool, Error> {
        let mut progressed = false;

        loop {
            let mut pending_names: Vec<String> = worklist
                .iter()
                .map(|p| p.entry.full_mod_name.clone())
                .collect();
            let mut resolved_any = false;
            let mut remaining = Vec::with_capacity(worklist.len());

            for mut pending in worklist.drain(..) {
                let mut still = Vec::new();
                for dep in pending.unresolved.drain(..) {
                    if self.is_unresolved(installed, &dep, available, &pending_names)? {
                        still.push(dep);
                    }
                }
                pending.unresolved = still;

                if pending.unresolved.is_empty() {
                    let name = pending.entry.full_mod_name.clone();
                    available.insert(name.clone());
                    if let Some(pos) = pending_names.iter().position(|n| *n == name) {
                        pending_names.remove(pos);
                    }
                    if plan.push(pending.entry) {
                        self.emit_resolver(ResolverEvent::RecordResolved { module: name });
                    }
                    resolved_any = true;
                } else {
                    remaining.push(pending);
                }
            }

            *worklist = remaining;
            if !resolved_any {
                return Ok(progressed);
            }
            progressed = true;
        }
    }

    fn is_unresolved(
        &self,
        installed: &StaticModules,
        dep: &Dependency,
        available: &BTreeSet<String>,
        pending_names: &[String],
    ) -> Result<bool, Error> {
        let mod_name = dep.full_mod_name();

        if self.options.retain_all && dep.external_module {
            return Ok(false);
        }
        if self.options.retain_all && !available.contains(&mod_name) {
            return Ok(true);
        }
        if pending_names.contains(&mod_name) {
            return Ok(true);
        }
        if available.contains(&mod_name) {
            return Ok(false);
        }
        // partial names (external modules) and hidden modules need the tool
        Ok(!installed.exists(&mod_name)?)
    }

    /// Try to resolve one dependency per pending record through the robot
    fn robot_round(
        &self,
        installed: &StaticModules,
        worklist: &mut Vec<Pending>,
        available: &mut BTreeSet<String>,
        plan: &mut BuildPlan,
        missing_easyconfigs: &mut Vec<String>,
        totally_missing: &mut Vec<String>,
    ) -> Result<bool, Error> {
        let being_installed: Vec<String> = worklist
            .iter()
            .map(|p| p.entry.full_mod_name.clone())
            .collect();
        let mut additional: Vec<Pending> = Vec::new();
        let mut progressed = false;

        for pending in worklist.iter_mut() {
            let Some(dep) = pending
                .unresolved
                .iter()
                .find(|d| !being_installed.contains(&d.full_mod_name()))
                .cloned()
            else {
                tracing::debug!(
                    module = %pending.entry.full_mod_name,
                    "no more candidate dependencies to resolve"
                );
                continue;
            };

            let mod_name = dep.full_mod_name();
            let path = self.source.find_easyconfig(&dep.name, &dep.full_version())?;
            self.emit_resolver(ResolverEvent::RobotLookup {
                module: mod_name.clone(),
                path: path.as_ref().map(|p| p.display().to_string()),
            });

            let Some(path) = path else {
                pending.strip(&dep);
                progressed = true;

                if installed.exists(&mod_name)? {
                    if !missing_easyconfigs.contains(&mod_name) {
                        missing_easyconfigs.push(mod_name.clone());
                        self.emit_resolver(ResolverEvent::MissingEasyconfig {
                            module: mod_name.clone(),
                        });
                    }
                    // nothing to build, so it is satisfied right away
                    if plan.push(PlanEntry::placeholder(mod_name.clone())) {
                        available.insert(mod_name);
                    }
                } else if !totally_missing.contains(&mod_name) {
                    totally_missing.push(mod_name.clone());
                    self.emit_resolver(ResolverEvent::TotallyMissing { module: mod_name });
                }
                continue;
            };

            let entry = self.load_dependency(&dep, path)?;
            let known = being_installed.contains(&entry.full_mod_name)
                || additional
                    .iter()
                    .any(|a| a.entry.full_mod_name == entry.full_mod_name);
            if !known {
                tracing::debug!(
                    dependency = %entry.full_mod_name,
                    parent = %pending.entry.full_mod_name,
                    "robot added dependency"
                );
                additional.push(Pending::new(entry));
                progressed = true;
            }
        }

        worklist.extend(additional);
        Ok(progressed)
    }

    /// Parse the easyconfig the robot found for `dep` and check it provides it
    fn load_dependency(&self, dep: &Dependency, path: PathBuf) -> Result<PlanEntry, Error> {
        let mut ec = self.source.parse_easyconfig(&path)?;
        if ec.spec_key() != dep.spec_key() {
            return Err(EasyconfigError::ModuleMismatch {
                path: path.display().to_string(),
                expected: dep.full_mod_name(),
                found: ec.full_mod_name(),
            }
            .into());
        }
        ec.hidden = dep.hidden;
        Ok(PlanEntry::new(ec, Some(path)))
    }
}

impl EventEmitter for Resolver<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names.into_iter().filter(|n| seen.insert(n.clone())).collect()
}
