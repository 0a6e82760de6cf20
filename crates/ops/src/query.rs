//! Easyconfig search and version selection

use crate::toolchain::parse_toolchain;
use crate::types::{SearchReport, VersionPick};
use crate::OpsCtx;
use hpcstack_errors::Error;
use hpcstack_events::{EventEmitter, TweakEvent};
use hpcstack_index::search_easyconfigs;
use hpcstack_tweak::available_versions;

/// Easyconfig files on the robot path whose name matches the regex `query`
///
/// # Errors
///
/// Returns an error if `query` is not a valid regular expression.
pub fn search(ctx: &OpsCtx, query: &str) -> Result<SearchReport, Error> {
    let paths = search_easyconfigs(query, ctx.source.roots(), &ctx.search_options())?;
    tracing::debug!(query, hits = paths.len(), "searched easyconfigs");
    Ok(SearchReport {
        query: query.to_string(),
        paths,
    })
}

/// Pick a version of `name` among those built with `toolchain`
///
/// # Errors
///
/// Returns an error if the toolchain specification is invalid, no version
/// is available, or a version cannot be parsed.
pub fn pick_version(
    ctx: &OpsCtx,
    name: &str,
    toolchain: &str,
    required: Option<&str>,
) -> Result<VersionPick, Error> {
    let tc = parse_toolchain(toolchain)?;
    let available: Vec<String> = available_versions(ctx.source.as_ref(), name, &tc)?
        .iter()
        .map(ToString::to_string)
        .collect();
    let (_, selected) = hpcstack_tweak::pick_version(required, &available)?;

    ctx.emit_tweak(TweakEvent::VersionPicked {
        name: name.to_string(),
        required: required.map(str::to_string),
        selected: selected.clone(),
    });

    Ok(VersionPick {
        name: name.to_string(),
        toolchain: tc.to_string(),
        required: required.map(str::to_string),
        available,
        selected,
    })
}
