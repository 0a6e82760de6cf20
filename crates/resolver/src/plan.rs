//! Build plan types

use hpcstack_types::{Dependency, EasyConfig};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// One step of a build plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// Parsed record; `None` for a placeholder of a module that exists
    /// without an easyconfig
    pub ec: Option<EasyConfig>,
    /// File the record was read from, if any
    pub spec: Option<PathBuf>,
    pub full_mod_name: String,
    /// Dependencies after irresolvable ones were stripped
    pub dependencies: Vec<Dependency>,
    pub hidden: bool,
}

impl PlanEntry {
    /// Entry for a record to be installed
    #[must_use]
    pub fn new(ec: EasyConfig, spec: Option<PathBuf>) -> Self {
        Self {
            full_mod_name: ec.full_mod_name(),
            dependencies: ec.all_dependencies(),
            hidden: ec.hidden,
            ec: Some(ec),
            spec,
        }
    }

    /// Placeholder for a dependency whose module exists but has no easyconfig
    #[must_use]
    pub fn placeholder(full_mod_name: impl Into<String>) -> Self {
        Self {
            ec: None,
            spec: None,
            full_mod_name: full_mod_name.into(),
            dependencies: Vec::new(),
            hidden: false,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.ec.is_none()
    }

    /// Software name, taken from the module name for placeholders
    #[must_use]
    pub fn software_name(&self) -> &str {
        match &self.ec {
            Some(ec) => &ec.name,
            None => self
                .full_mod_name
                .split_once('/')
                .map_or(self.full_mod_name.as_str(), |(name, _)| name),
        }
    }
}

impl fmt::Display for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.spec {
            Some(spec) => write!(f, "{} ({})", self.full_mod_name, spec.display()),
            None => f.write_str(&self.full_mod_name),
        }
    }
}

/// Ordered build plan: every entry comes after the entries it depends on
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildPlan {
    entries: Vec<PlanEntry>,
}

impl BuildPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless one with the same module name is present
    pub fn push(&mut self, entry: PlanEntry) -> bool {
        if self.contains(&entry.full_mod_name) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    #[must_use]
    pub fn contains(&self, full_mod_name: &str) -> bool {
        self.entries.iter().any(|e| e.full_mod_name == full_mod_name)
    }

    #[must_use]
    pub fn get(&self, full_mod_name: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.full_mod_name == full_mod_name)
    }

    #[must_use]
    pub fn position(&self, full_mod_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.full_mod_name == full_mod_name)
    }

    #[must_use]
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<PlanEntry> {
        self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter()
    }

    /// Records of the plan in order, placeholders skipped
    pub fn records(&self) -> impl Iterator<Item = &EasyConfig> {
        self.entries.iter().filter_map(|e| e.ec.as_ref())
    }

    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.full_mod_name.clone()).collect()
    }

    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_placeholder()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dependency graph in DOT format, with an edge from every entry to each
    /// of its dependencies in the plan
    ///
    /// Nodes are labelled by software name when no name occurs twice, and by
    /// module name otherwise.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let names: BTreeSet<&str> = self.entries.iter().map(PlanEntry::software_name).collect();
        let by_name = names.len() == self.entries.len();
        let label = |entry: &PlanEntry| -> String {
            let label = if by_name {
                entry.software_name()
            } else {
                entry.full_mod_name.as_str()
            };
            format!("\"{}\"", label.replace('"', "\\\""))
        };

        let mut out = String::from("digraph dependencies {\n");
        for entry in &self.entries {
            let _ = writeln!(out, "  {};", label(entry));
        }
        for entry in &self.entries {
            for dep in &entry.dependencies {
                if let Some(target) = self.get(&dep.full_mod_name()) {
                    let _ = writeln!(out, "  {} -> {};", label(entry), label(target));
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

impl IntoIterator for BuildPlan {
    type Item = PlanEntry;
    type IntoIter = std::vec::IntoIter<PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
