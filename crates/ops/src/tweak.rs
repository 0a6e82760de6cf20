//! Moving easyconfigs to another toolchain

use crate::resolve::{load_requested, resolve_with};
use crate::toolchain::parse_toolchain;
use crate::types::{ObtainReport, TweakReport, TweakedModule};
use crate::OpsCtx;
use hpcstack_errors::{Error, OpsError};
use hpcstack_resolver::{BuildPlan, ResolveOptions};
use hpcstack_tweak::{EasyconfigRequest, Obtainer, SuffixMapping, Tweaker};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Names of plan records that appear as `-<name>-` in some versionsuffix
fn suffix_software(plan: &BuildPlan) -> BTreeSet<String> {
    let suffixes: BTreeSet<&str> = plan
        .records()
        .flat_map(|ec| {
            std::iter::once(ec.versionsuffix.as_str()).chain(
                ec.dependencies
                    .iter()
                    .chain(&ec.builddependencies)
                    .map(|d| d.versionsuffix.as_str()),
            )
        })
        .filter(|s| !s.is_empty())
        .collect();

    plan.records()
        .map(|ec| ec.name.as_str())
        .filter(|name| {
            let marker = format!("-{name}-");
            suffixes.iter().any(|s| s.contains(&marker))
        })
        .map(str::to_string)
        .collect()
}

/// Rewrite the requested easyconfigs and their dependencies for `target`
///
/// Every requested easyconfig must use the same toolchain. The rewritten
/// records are written to `output_dir` when given.
///
/// # Errors
///
/// Returns an error if the easyconfigs cannot be loaded or resolved, the
/// toolchains cannot be mapped, a versionsuffix mapping is ambiguous, or a
/// record cannot be written.
pub fn tweak(
    ctx: &OpsCtx,
    specs: &[String],
    target: &str,
    output_dir: Option<&Path>,
) -> Result<TweakReport, Error> {
    let target_tc = parse_toolchain(target)?;
    let requested = load_requested(ctx, specs)?;

    let toolchains: BTreeSet<_> = requested
        .iter()
        .filter_map(|e| e.ec.as_ref().map(|ec| ec.toolchain.clone()))
        .collect();
    let mut toolchains = toolchains.into_iter();
    let (Some(source_tc), None) = (toolchains.next(), toolchains.next()) else {
        let names = requested
            .iter()
            .filter_map(|e| e.ec.as_ref().map(|ec| ec.toolchain.to_string()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        return Err(OpsError::MixedToolchains { toolchains: names }.into());
    };

    let options = ResolveOptions {
        retain_all: true,
        tolerate_missing_easyconfigs: true,
        ..ctx.resolve_options()
    };
    let plan = resolve_with(ctx, &requested, options)?;

    let builder = ctx.hierarchy_builder();
    let mapping = ctx.hierarchy_mapper(&builder).map(&source_tc, &target_tc)?;

    let suffix_mapper = ctx.suffix_mapper(&builder);
    let mut suffixes = SuffixMapping::new();
    for software in suffix_software(&plan) {
        suffixes.extend(suffix_mapper.map_common_versionsuffixes(&software, &source_tc, &mapping)?);
    }

    let source_hierarchy = builder.build(&source_tc, false)?;
    let tweaked = Tweaker::new(&mapping, &suffixes)
        .with_event_sender(Some(ctx.tx.clone()))
        .tweak_plan(&plan, &source_hierarchy);

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir).map_err(|e| Error::io_with_path(&e, dir))?;
    }

    let mut records = Vec::with_capacity(tweaked.len());
    for record in tweaked {
        let written_to = match output_dir {
            Some(dir) => {
                let path = dir.join(record.file_name());
                fs::write(&path, record.to_yaml()?).map_err(|e| Error::io_with_path(&e, &path))?;
                tracing::info!(path = %path.display(), module = %record.ec.full_mod_name(), "wrote tweaked easyconfig");
                Some(path)
            }
            None => None,
        };
        records.push(TweakedModule {
            original: record.original.clone(),
            module: record.ec.full_mod_name(),
            file_name: record.file_name(),
            written_to,
        });
    }

    Ok(TweakReport {
        source: source_tc.to_string(),
        target: target_tc.to_string(),
        mapping,
        suffixes,
        records,
    })
}

/// Select the easyconfig closest to `request`, generating one when no
/// existing easyconfig matches it exactly
///
/// A generated easyconfig is written to `output_dir`, or to the configured
/// tweaked easyconfigs path when no directory is given.
///
/// # Errors
///
/// Returns an error if no single easyconfig can be selected or the generated
/// one cannot be written.
pub fn obtain(
    ctx: &OpsCtx,
    request: &EasyconfigRequest,
    output_dir: Option<&Path>,
) -> Result<ObtainReport, Error> {
    let obtained = Obtainer::new(ctx.source.as_ref())
        .with_event_sender(Some(ctx.tx.clone()))
        .obtain(request)?;

    let output_dir = output_dir.or(ctx.config.robot.tweaked_path.as_deref());
    let written_to = match output_dir {
        Some(dir) if obtained.generated => {
            fs::create_dir_all(dir).map_err(|e| Error::io_with_path(&e, dir))?;
            let path = dir.join(obtained.file_name());
            fs::write(&path, obtained.to_yaml()?).map_err(|e| Error::io_with_path(&e, &path))?;
            tracing::info!(path = %path.display(), template = %obtained.template.display(), "wrote generated easyconfig");
            Some(path)
        }
        _ => None,
    };

    Ok(ObtainReport {
        module: obtained.ec.full_mod_name(),
        file_name: obtained.file_name(),
        template: obtained.template,
        generated: obtained.generated,
        written_to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcstack_resolver::PlanEntry;
    use hpcstack_types::{Dependency, EasyConfig, ToolchainRef};

    #[test]
    fn test_suffix_software_found_in_dependencies() {
        let gcc = ToolchainRef::new("GCC", "7.3.0-2.30");
        let mut numpy = EasyConfig::new("numpy", "1.15.0", gcc.clone());
        numpy
            .dependencies
            .push(Dependency::new("Python", "3.6.6", gcc.clone()));
        let mut scipy = EasyConfig::new("scipy", "1.1.0", gcc.clone());
        scipy.versionsuffix = "-Python-3.6.6".to_string();

        let mut plan = BuildPlan::new();
        plan.push(PlanEntry::new(EasyConfig::new("Python", "3.6.6", gcc), None));
        plan.push(PlanEntry::new(numpy, None));
        plan.push(PlanEntry::new(scipy, None));

        assert_eq!(suffix_software(&plan), BTreeSet::from(["Python".to_string()]));
    }

    #[test]
    fn test_suffix_software_found_after_other_suffix() {
        let gcc = ToolchainRef::new("GCC", "7.3.0-2.30");
        let mut h5py = EasyConfig::new("h5py", "2.8.0", gcc.clone());
        h5py.versionsuffix = "-serial-Python-3.6.6".to_string();

        let mut plan = BuildPlan::new();
        plan.push(PlanEntry::new(EasyConfig::new("Python", "3.6.6", gcc), None));
        plan.push(PlanEntry::new(h5py, None));

        assert_eq!(suffix_software(&plan), BTreeSet::from(["Python".to_string()]));
    }
}
