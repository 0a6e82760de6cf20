//! Easyconfig file search below the robot paths

use hpcstack_errors::{EasyconfigError, Error};
use hpcstack_types::{ToolchainRef, EASYCONFIG_EXTENSION};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Filters applied while walking robot paths
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Directory names never descended into
    pub ignore_dirs: Vec<String>,
    /// Name of the archive subtree
    pub archive_dir: String,
    pub include_archived: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            ignore_dirs: vec![".git".to_string(), ".svn".to_string()],
            archive_dir: "__archive__".to_string(),
            include_archived: false,
        }
    }
}

impl SearchOptions {
    fn is_excluded_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
            || (!self.include_archived && name == self.archive_dir)
    }

    fn is_archived(&self, path: &Path) -> bool {
        !self.include_archived
            && path
                .components()
                .any(|c| c.as_os_str() == self.archive_dir.as_str())
    }
}

/// Robot search path in priority order: tweaked easyconfigs, then easyconfigs
/// of a pending contribution, then the configured paths (duplicates dropped)
#[must_use]
pub fn det_robot_path(
    robot_paths: &[PathBuf],
    tweaked_path: Option<&Path>,
    pr_path: Option<&Path>,
) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for path in [tweaked_path, pr_path].into_iter().flatten() {
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
    }
    for path in robot_paths {
        if !paths.contains(path) {
            paths.push(path.clone());
        }
    }
    paths
}

/// Walk `roots` and return files whose name matches `pattern`
#[must_use]
pub fn search_files(pattern: &Regex, roots: &[PathBuf], options: &SearchOptions) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut hits = Vec::new();

    for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !options.is_excluded_dir(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if pattern.is_match(&entry.file_name().to_string_lossy()) {
                let path = entry.into_path();
                if seen.insert(path.clone()) {
                    hits.push(path);
                }
            }
        }
    }
    hits
}

/// Regex search over easyconfig file names
///
/// # Errors
///
/// Returns an error if `query` is not a valid regular expression.
pub fn search_easyconfigs(
    query: &str,
    roots: &[PathBuf],
    options: &SearchOptions,
) -> Result<Vec<PathBuf>, Error> {
    let pattern = Regex::new(query).map_err(|e| EasyconfigError::InvalidPattern {
        pattern: query.to_string(),
        message: e.to_string(),
    })?;
    let ext = format!(".{EASYCONFIG_EXTENSION}");
    Ok(search_files(&pattern, roots, options)
        .into_iter()
        .filter(|p| p.to_string_lossy().ends_with(&ext))
        .collect())
}

/// Candidate locations of `<name>-<installver>.eb` below one root
fn candidate_paths(root: &Path, name: &str, installver: &str) -> Vec<PathBuf> {
    let file = format!("{name}-{installver}.{EASYCONFIG_EXTENSION}");
    let mut paths = vec![
        root.join(name)
            .join(format!("{installver}.{EASYCONFIG_EXTENSION}")),
        root.join(name).join(&file),
    ];
    if let Some(letter) = name.chars().next() {
        paths.push(
            root.join(letter.to_lowercase().to_string())
                .join(name)
                .join(&file),
        );
    }
    paths.push(root.join(&file));
    paths
}

fn wildcard_regex(file_name: &str) -> Option<Regex> {
    let escaped: Vec<String> = file_name.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", escaped.join(".*"))).ok()
}

/// Find easyconfig files for `name` at `installver` (`*` acts as a wildcard)
///
/// Results keep the order roots and locations were searched in, without
/// duplicates and without archived files.
#[must_use]
pub fn find_matching_easyconfigs(
    name: &str,
    installver: &str,
    roots: &[PathBuf],
    options: &SearchOptions,
) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for root in roots {
        for candidate in candidate_paths(root, name, installver) {
            let matches = if installver.contains('*') {
                expand_wildcard(&candidate)
            } else if candidate.is_file() {
                vec![candidate]
            } else {
                Vec::new()
            };

            for path in matches {
                if options.is_archived(path.strip_prefix(root).unwrap_or(&path)) {
                    continue;
                }
                if seen.insert(path.clone()) {
                    found.push(path);
                }
            }
        }
    }
    found
}

fn expand_wildcard(candidate: &Path) -> Vec<PathBuf> {
    let (Some(dir), Some(file_name)) = (candidate.parent(), candidate.file_name()) else {
        return Vec::new();
    };
    let Some(pattern) = wildcard_regex(&file_name.to_string_lossy()) else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut hits: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|n| pattern.is_match(&n.to_string_lossy()))
        })
        .collect();
    hits.sort();
    hits
}

/// Easyconfigs whose file name starts with `prefix_stub` and carries the
/// suffix of `toolchain` (`""` for system, `-<name>-<version>` otherwise)
///
/// Returns the matching paths together with the suffix searched for.
#[must_use]
pub fn get_matching_easyconfig_candidates(
    prefix_stub: &str,
    toolchain: &ToolchainRef,
    roots: &[PathBuf],
    options: &SearchOptions,
) -> (Vec<PathBuf>, String) {
    let toolchain_suffix = toolchain.version_suffix();
    let pattern = format!(
        "^{}.*{}.*\\.{EASYCONFIG_EXTENSION}$",
        regex::escape(prefix_stub),
        regex::escape(&toolchain_suffix)
    );
    let paths = match Regex::new(&pattern) {
        Ok(re) => search_files(&re, roots, options),
        Err(err) => {
            tracing::warn!(pattern = %pattern, error = %err, "invalid candidate pattern");
            Vec::new()
        }
    };
    (paths, toolchain_suffix)
}
