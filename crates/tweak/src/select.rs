//! Version selection

use hpcstack_errors::{Error, VersionError};
use hpcstack_types::LooseVersion;

/// Pick a version among `available`
///
/// Without a requirement the most recent version is picked and also becomes
/// the effective requirement. With a requirement the most recent version not
/// newer than it is picked, falling back to the oldest version when every
/// candidate is newer. Returns `(effective requirement, selected version)`.
///
/// # Errors
///
/// Returns an error if `available` is empty or contains an invalid version.
pub fn pick_version<S: AsRef<str>>(
    required: Option<&str>,
    available: &[S],
) -> Result<(String, String), Error> {
    let mut versions = available
        .iter()
        .map(|v| LooseVersion::parse(v.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    versions.sort();

    let (Some(oldest), Some(newest)) = (versions.first(), versions.last()) else {
        return Err(VersionError::NoCandidates.into());
    };

    let Some(required) = required.filter(|r| !r.trim().is_empty()) else {
        return Ok((newest.to_string(), newest.to_string()));
    };
    let wanted = LooseVersion::parse(required)?;
    let selected = versions
        .iter()
        .rev()
        .find(|v| **v <= wanted)
        .unwrap_or(oldest);

    tracing::debug!(required, selected = %selected, "picked version");
    Ok((required.to_string(), selected.to_string()))
}
