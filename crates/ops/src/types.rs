//! Report types returned by operations

use hpcstack_resolver::{BuildPlan, ConflictReport};
use hpcstack_toolchain::ToolchainMapping;
use hpcstack_tweak::SuffixMapping;
use hpcstack_types::HierarchyEntry;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Name of the variable standing in for the common path prefix
pub const SHORT_PREFIX_VAR: &str = "CFGS";

/// One step of a resolved build order
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedModule {
    pub module: String,
    /// Easyconfig file, absent for placeholders
    pub spec: Option<PathBuf>,
    /// Installed module without an easyconfig
    pub placeholder: bool,
}

/// Ordered build plan
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResolveReport {
    pub order: Vec<PlannedModule>,
    pub placeholders: usize,
    /// Requested modules left out because they are already installed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl From<&BuildPlan> for ResolveReport {
    fn from(plan: &BuildPlan) -> Self {
        Self {
            order: plan
                .iter()
                .map(|entry| PlannedModule {
                    module: entry.full_mod_name.clone(),
                    spec: entry.spec.clone(),
                    placeholder: entry.is_placeholder(),
                })
                .collect(),
            placeholders: plan.placeholder_count(),
            skipped: Vec::new(),
        }
    }
}

/// Build status of a dry-run item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// No module yet
    Missing,
    /// Module already installed
    Available,
    /// Installed but requested with `--force`
    Forced,
    /// Installed but requested with `--rebuild`
    Rebuild,
}

impl BuildStatus {
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Missing => ' ',
            Self::Available => 'x',
            Self::Forced => 'F',
            Self::Rebuild => 'R',
        }
    }
}

/// One line of a dry-run overview
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DryRunItem {
    pub status: BuildStatus,
    /// Easyconfig path as displayed, possibly shortened
    pub path: String,
    pub module: String,
}

/// Build status of every easyconfig in a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    pub heading: String,
    /// Prefix replaced by `$CFGS` in short mode
    pub common_prefix: Option<String>,
    pub items: Vec<DryRunItem>,
}

impl DryRunReport {
    /// Markdown-compatible overview, one checkbox per item
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.heading.clone();
        if let Some(prefix) = &self.common_prefix {
            let _ = write!(out, "\n{SHORT_PREFIX_VAR}={prefix}");
        }
        for item in &self.items {
            let _ = write!(
                out,
                "\n * [{}] {} (module: {})",
                item.status.marker(),
                item.path,
                item.module
            );
        }
        out
    }
}

/// Conflict check outcome
#[derive(Clone, Debug, Serialize)]
pub struct ConflictsReport {
    pub conflicts_found: bool,
    #[serde(flatten)]
    pub report: ConflictReport,
}

/// Hierarchy of one toolchain, most basic level first
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HierarchyReport {
    pub toolchain: String,
    pub levels: Vec<HierarchyEntry>,
}

/// Mapping between two toolchain hierarchies
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MappingReport {
    pub source: String,
    pub target: String,
    pub mapping: ToolchainMapping,
}

/// Easyconfig files matching a query
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub paths: Vec<PathBuf>,
}

/// Dependency graph written in DOT format
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DepGraphReport {
    pub path: PathBuf,
    pub nodes: usize,
    pub edges: usize,
}

/// Version picked among the available ones
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionPick {
    pub name: String,
    pub toolchain: String,
    pub required: Option<String>,
    pub available: Vec<String>,
    pub selected: String,
}

/// One rewritten easyconfig
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TweakedModule {
    pub original: String,
    pub module: String,
    pub file_name: String,
    /// Where the record was written, if an output directory was given
    pub written_to: Option<PathBuf>,
}

/// Outcome of moving a set of easyconfigs to another toolchain
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TweakReport {
    pub source: String,
    pub target: String,
    pub mapping: ToolchainMapping,
    pub suffixes: SuffixMapping,
    pub records: Vec<TweakedModule>,
}

/// Easyconfig selected or generated for a software request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObtainReport {
    pub module: String,
    pub file_name: String,
    /// Existing easyconfig returned as is or used as the template
    pub template: PathBuf,
    pub generated: bool,
    /// Where a generated easyconfig was written
    pub written_to: Option<PathBuf>,
}
