//! Build order, dry-run overview and conflict checks

use crate::types::{
    BuildStatus, ConflictsReport, DepGraphReport, DryRunItem, DryRunReport, ResolveReport,
    SHORT_PREFIX_VAR,
};
use crate::OpsCtx;
use hpcstack_errors::{EasyconfigError, Error, OpsError};
use hpcstack_events::{EventEmitter, ResolverEvent};
use hpcstack_resolver::{BuildPlan, ConflictChecker, PlanEntry, ResolveOptions, Resolver};
use hpcstack_types::EASYCONFIG_EXTENSION;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Switches of the dry-run overview
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunOptions {
    /// Replace the common path prefix by `$CFGS`
    pub short: bool,
    pub force: bool,
    pub rebuild: bool,
}

/// Locate an easyconfig given as a path or as a file name on the robot path
fn locate(ctx: &OpsCtx, spec: &str) -> Result<PathBuf, Error> {
    let path = PathBuf::from(spec);
    if path.is_file() {
        return Ok(path);
    }

    let ext = format!(".{EASYCONFIG_EXTENSION}");
    let file_name = path
        .file_name()
        .map_or_else(|| spec.to_string(), |n| n.to_string_lossy().into_owned());
    let stem = file_name.strip_suffix(&ext).unwrap_or(&file_name).to_string();
    let wanted = format!("{stem}{ext}");

    ctx.source
        .candidates(&stem, None)?
        .into_iter()
        .find(|p| p.file_name().is_some_and(|n| n.to_string_lossy() == wanted))
        .ok_or_else(|| {
            EasyconfigError::FileNotFound {
                path: spec.to_string(),
            }
            .into()
        })
}

/// Parse the requested easyconfigs into plan entries
///
/// # Errors
///
/// Returns an error if nothing was requested, or an easyconfig cannot be
/// found or parsed.
pub fn load_requested(ctx: &OpsCtx, specs: &[String]) -> Result<Vec<PlanEntry>, Error> {
    if specs.is_empty() {
        return Err(OpsError::NoEasyconfigsSpecified.into());
    }
    specs
        .iter()
        .map(|spec| {
            let path = locate(ctx, spec)?;
            let ec = ctx.source.parse_easyconfig(&path)?;
            tracing::debug!(path = %path.display(), module = %ec.full_mod_name(), "loaded easyconfig");
            Ok(PlanEntry::new(ec, Some(path)))
        })
        .collect()
}

pub(crate) fn resolve_with(
    ctx: &OpsCtx,
    requested: &[PlanEntry],
    options: ResolveOptions,
) -> Result<BuildPlan, Error> {
    Resolver::new(ctx.source.as_ref(), ctx.modules.as_ref())
        .with_options(options)
        .with_event_sender(Some(ctx.tx.clone()))
        .resolve(requested)
}

/// Split off the requested entries whose module is already installed
fn skip_available(ctx: &OpsCtx, requested: Vec<PlanEntry>) -> Result<(Vec<PlanEntry>, Vec<String>), Error> {
    let mut kept = Vec::with_capacity(requested.len());
    let mut skipped = Vec::new();
    for entry in requested {
        if ctx.modules.exists(&entry.full_mod_name)? {
            tracing::info!(module = %entry.full_mod_name, "already installed (module found), skipping");
            ctx.emit_resolver(ResolverEvent::AlreadyInstalled {
                module: entry.full_mod_name.clone(),
            });
            skipped.push(entry.full_mod_name);
        } else {
            kept.push(entry);
        }
    }
    Ok((kept, skipped))
}

/// Ordered build plan for the requested easyconfigs
///
/// With `resolve.skip_available` set, requested easyconfigs whose module is
/// already installed are left out before resolving.
///
/// # Errors
///
/// Returns an error if an easyconfig cannot be loaded, installed modules
/// cannot be listed, or the dependencies cannot be resolved.
pub fn resolve(ctx: &OpsCtx, specs: &[String]) -> Result<ResolveReport, Error> {
    let mut requested = load_requested(ctx, specs)?;
    let mut skipped = Vec::new();
    if ctx.config.resolve.skip_available {
        (requested, skipped) = skip_available(ctx, requested)?;
    }

    let plan = if requested.is_empty() {
        tracing::info!("no easyconfigs left to be built");
        BuildPlan::new()
    } else {
        resolve_with(ctx, &requested, ctx.resolve_options())?
    };
    let mut report = ResolveReport::from(&plan);
    report.skipped = skipped;
    Ok(report)
}

/// Write the dependency graph of the requested easyconfigs to `output` in
/// DOT format
///
/// Installed dependencies are kept so the graph is complete.
///
/// # Errors
///
/// Returns an error if an easyconfig cannot be loaded, the dependencies
/// cannot be resolved, or the file cannot be written.
pub fn dep_graph(ctx: &OpsCtx, specs: &[String], output: &Path) -> Result<DepGraphReport, Error> {
    let requested = load_requested(ctx, specs)?;
    let options = ResolveOptions {
        retain_all: true,
        ..ctx.resolve_options()
    };
    let plan = resolve_with(ctx, &requested, options)?;

    if let Some(dir) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| Error::io_with_path(&e, dir))?;
    }
    fs::write(output, plan.to_dot()).map_err(|e| Error::io_with_path(&e, output))?;

    let edges = plan
        .iter()
        .map(|entry| {
            entry
                .dependencies
                .iter()
                .filter(|dep| plan.contains(&dep.full_mod_name()))
                .count()
        })
        .sum();
    tracing::info!(path = %output.display(), nodes = plan.len(), edges, "wrote dependency graph");
    Ok(DepGraphReport {
        path: output.to_path_buf(),
        nodes: plan.len(),
        edges,
    })
}

/// Build status of the requested easyconfigs and, with the robot enabled,
/// of all their dependencies
///
/// # Errors
///
/// Returns an error if an easyconfig cannot be loaded, the dependencies
/// cannot be resolved, or installed modules cannot be listed.
pub fn dry_run(ctx: &OpsCtx, specs: &[String], options: DryRunOptions) -> Result<DryRunReport, Error> {
    let requested = load_requested(ctx, specs)?;

    let (heading, plan) = if ctx.config.robot.enabled {
        let resolve_options = ResolveOptions {
            retain_all: true,
            ..ctx.resolve_options()
        };
        (
            "Dry run: printing build status of easyconfigs and dependencies",
            resolve_with(ctx, &requested, resolve_options)?,
        )
    } else {
        let mut plan = BuildPlan::new();
        for entry in &requested {
            plan.push(entry.clone());
        }
        ("Dry run: printing build status of easyconfigs", plan)
    };

    let listed: Vec<PathBuf> = requested.iter().filter_map(|e| e.spec.clone()).collect();
    let available = ctx.modules.available()?;
    Ok(dry_run_overview(heading, &plan, &listed, &available, options))
}

/// Dry-run overview of `plan`; `listed` holds the paths requested explicitly
#[must_use]
pub fn dry_run_overview(
    heading: &str,
    plan: &BuildPlan,
    listed: &[PathBuf],
    available: &BTreeSet<String>,
    options: DryRunOptions,
) -> DryRunReport {
    let paths: Vec<&Path> = plan.iter().filter_map(|e| e.spec.as_deref()).collect();
    let common_prefix = common_path_prefix(&paths)
        .map(|p| p.display().to_string())
        .filter(|p| options.short && p.len() > SHORT_PREFIX_VAR.len() * 2);

    let items = plan
        .iter()
        .map(|entry| {
            let is_listed = entry.spec.as_ref().is_some_and(|s| listed.contains(s));
            let status = match (available.contains(&entry.full_mod_name), is_listed) {
                (false, _) => BuildStatus::Missing,
                (true, true) if options.force => BuildStatus::Forced,
                (true, true) if options.rebuild => BuildStatus::Rebuild,
                (true, _) => BuildStatus::Available,
            };

            let path = match (&entry.spec, &common_prefix) {
                (Some(spec), Some(prefix)) => {
                    let spec = spec.display().to_string();
                    let rest = spec.get(prefix.len() + 1..).unwrap_or_default();
                    format!("${SHORT_PREFIX_VAR}/{rest}")
                }
                (Some(spec), None) => spec.display().to_string(),
                (None, _) => "-".to_string(),
            };

            DryRunItem {
                status,
                path,
                module: entry.full_mod_name.clone(),
            }
        })
        .collect();

    DryRunReport {
        heading: heading.to_string(),
        common_prefix,
        items,
    }
}

/// Deepest directory containing every path, if it is more than the root
fn common_path_prefix(paths: &[&Path]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;
    let mut common: Vec<Component<'_>> = first.parent()?.components().collect();
    for path in rest {
        let parent: Vec<Component<'_>> = path.parent()?.components().collect();
        let shared = common
            .iter()
            .zip(&parent)
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }

    let prefix: PathBuf = common.iter().collect();
    let only_root = common
        .iter()
        .all(|c| matches!(c, Component::RootDir | Component::Prefix(_)));
    (!only_root).then_some(prefix)
}

/// Check the dependency graphs of the requested easyconfigs for version
/// conflicts
///
/// # Errors
///
/// Returns an error if an easyconfig cannot be loaded or the dependency
/// graph cannot be resolved. Conflicts themselves are not errors.
pub fn check_conflicts(ctx: &OpsCtx, specs: &[String]) -> Result<ConflictsReport, Error> {
    let requested = load_requested(ctx, specs)?;
    let report = ConflictChecker::new(ctx.source.as_ref(), ctx.modules.as_ref())
        .with_wrapper_policy(ctx.wrapper_policy())
        .with_inter_ec_conflicts(ctx.config.conflicts.check_inter_ec_conflicts)
        .with_event_sender(Some(ctx.tx.clone()))
        .check(&requested)?;
    Ok(ConflictsReport {
        conflicts_found: report.has_conflicts(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcstack_types::{EasyConfig, ToolchainRef};

    fn entry(name: &str, version: &str, spec: &str) -> PlanEntry {
        PlanEntry::new(
            EasyConfig::new(name, version, ToolchainRef::system()),
            Some(PathBuf::from(spec)),
        )
    }

    fn plan() -> BuildPlan {
        let mut plan = BuildPlan::new();
        plan.push(entry("zlib", "1.2.8", "/srv/easybuild/easyconfigs/z/zlib/zlib-1.2.8.eb"));
        plan.push(entry("gzip", "1.4", "/srv/easybuild/easyconfigs/g/gzip/gzip-1.4.eb"));
        plan
    }

    #[test]
    fn test_common_path_prefix() {
        let a = Path::new("/srv/ecs/a/x.eb");
        let b = Path::new("/srv/ecs/b/y.eb");
        assert_eq!(common_path_prefix(&[a, b]), Some(PathBuf::from("/srv/ecs")));
        assert_eq!(common_path_prefix(&[a]), Some(PathBuf::from("/srv/ecs/a")));
        assert_eq!(
            common_path_prefix(&[Path::new("/a/x.eb"), Path::new("/b/y.eb")]),
            None
        );
        assert_eq!(common_path_prefix(&[]), None);
    }

    #[test]
    fn test_status_markers() {
        let listed = vec![PathBuf::from("/srv/easybuild/easyconfigs/g/gzip/gzip-1.4.eb")];
        let available: BTreeSet<String> = ["zlib/1.2.8".to_string(), "gzip/1.4".to_string()].into();

        let plain = dry_run_overview("Dry run", &plan(), &listed, &available, DryRunOptions::default());
        let markers: Vec<char> = plain.items.iter().map(|i| i.status.marker()).collect();
        assert_eq!(markers, vec!['x', 'x']);

        let forced = DryRunOptions {
            force: true,
            ..DryRunOptions::default()
        };
        let report = dry_run_overview("Dry run", &plan(), &listed, &available, forced);
        assert_eq!(report.items[0].status, BuildStatus::Available);
        assert_eq!(report.items[1].status, BuildStatus::Forced);

        let rebuild = DryRunOptions {
            rebuild: true,
            ..DryRunOptions::default()
        };
        let report = dry_run_overview("Dry run", &plan(), &listed, &BTreeSet::new(), rebuild);
        assert!(report.items.iter().all(|i| i.status == BuildStatus::Missing));
    }

    #[test]
    fn test_short_output_uses_prefix_variable() {
        let short = DryRunOptions {
            short: true,
            ..DryRunOptions::default()
        };
        let report = dry_run_overview("Dry run", &plan(), &[], &BTreeSet::new(), short);
        assert_eq!(report.common_prefix.as_deref(), Some("/srv/easybuild/easyconfigs"));
        assert_eq!(report.items[0].path, "$CFGS/z/zlib/zlib-1.2.8.eb");
        assert!(report.render().lines().nth(1).unwrap().starts_with("CFGS=/srv"));

        let long = dry_run_overview("Dry run", &plan(), &[], &BTreeSet::new(), DryRunOptions::default());
        assert!(long.common_prefix.is_none());
        assert_eq!(long.items[1].path, "/srv/easybuild/easyconfigs/g/gzip/gzip-1.4.eb");
    }
}
