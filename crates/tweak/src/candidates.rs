//! Candidate easyconfigs for a software name and toolchain

use hpcstack_errors::Error;
use hpcstack_index::EasyconfigSource;
use hpcstack_types::{EasyConfig, LooseVersion, ToolchainRef};
use std::path::PathBuf;

/// Easyconfigs of `software` built with exactly `toolchain`, by file path
///
/// # Errors
///
/// Returns an error if a candidate cannot be parsed.
pub fn easyconfigs_with_toolchain(
    source: &dyn EasyconfigSource,
    software: &str,
    toolchain: &ToolchainRef,
) -> Result<Vec<(PathBuf, EasyConfig)>, Error> {
    let prefix_stub = format!("{software}-");
    let mut found = Vec::new();
    for path in source.candidates(&prefix_stub, Some(toolchain))? {
        let ec = source.parse_easyconfig(&path)?;
        if ec.name == software && ec.toolchain == *toolchain {
            found.push((path, ec));
        }
    }
    Ok(found)
}

/// Distinct versions of `software` available with `toolchain`, oldest first
///
/// # Errors
///
/// Returns an error if a candidate cannot be parsed or carries an invalid
/// version.
pub fn available_versions(
    source: &dyn EasyconfigSource,
    software: &str,
    toolchain: &ToolchainRef,
) -> Result<Vec<LooseVersion>, Error> {
    let mut versions = easyconfigs_with_toolchain(source, software, toolchain)?
        .into_iter()
        .map(|(_, ec)| LooseVersion::parse(&ec.version))
        .collect::<Result<Vec<_>, _>>()?;
    versions.sort();
    versions.dedup();
    Ok(versions)
}
