//! Easyconfig lookup ("robot") and parsing

use crate::format::parse_easyconfig_str;
use crate::search::{
    find_matching_easyconfigs, get_matching_easyconfig_candidates, SearchOptions,
};
use hpcstack_errors::{EasyconfigError, Error};
use hpcstack_types::{EasyConfig, ToolchainRef};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where easyconfigs come from
pub trait EasyconfigSource {
    /// Locate the easyconfig providing `name` at `full_version`
    ///
    /// # Errors
    ///
    /// Returns an error only if the lookup itself fails; "not found" is `Ok(None)`.
    fn find_easyconfig(&self, name: &str, full_version: &str) -> Result<Option<PathBuf>, Error>;

    /// Parse the easyconfig at `path`
    ///
    /// # Errors
    ///
    /// Returns an error tagged with `path` if it cannot be read or parsed.
    fn parse_easyconfig(&self, path: &Path) -> Result<EasyConfig, Error>;

    /// Search roots, when the source is backed by directories
    fn roots(&self) -> &[PathBuf] {
        &[]
    }

    /// Easyconfigs whose file name starts with `prefix_stub` and carries the
    /// suffix of `toolchain`; `None` matches any toolchain
    ///
    /// # Errors
    ///
    /// Returns an error only if the search itself fails.
    fn candidates(
        &self,
        prefix_stub: &str,
        toolchain: Option<&ToolchainRef>,
    ) -> Result<Vec<PathBuf>, Error> {
        Ok(candidates_below(prefix_stub, toolchain, self.roots(), &SearchOptions::default()))
    }
}

/// The system suffix is empty, so searching with it matches any toolchain
fn candidates_below(
    prefix_stub: &str,
    toolchain: Option<&ToolchainRef>,
    roots: &[PathBuf],
    options: &SearchOptions,
) -> Vec<PathBuf> {
    let any = ToolchainRef::system();
    get_matching_easyconfig_candidates(prefix_stub, toolchain.unwrap_or(&any), roots, options).0
}

/// Easyconfigs found on disk below an ordered list of robot paths
///
/// Parsed files are memoised per path for the lifetime of the value.
#[derive(Debug, Default)]
pub struct RobotPath {
    paths: Vec<PathBuf>,
    options: SearchOptions,
    parsed: RefCell<HashMap<PathBuf, EasyConfig>>,
}

impl RobotPath {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>, options: SearchOptions) -> Self {
        Self {
            paths,
            options,
            parsed: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Forget memoised parse results
    pub fn clear(&self) {
        self.parsed.borrow_mut().clear();
    }
}

impl EasyconfigSource for RobotPath {
    fn find_easyconfig(&self, name: &str, full_version: &str) -> Result<Option<PathBuf>, Error> {
        let hits = find_matching_easyconfigs(name, full_version, &self.paths, &self.options);
        if let Some(path) = hits.first() {
            tracing::debug!(name, full_version, path = %path.display(), "robot found easyconfig");
        }
        Ok(hits.into_iter().next())
    }

    fn parse_easyconfig(&self, path: &Path) -> Result<EasyConfig, Error> {
        if let Some(ec) = self.parsed.borrow().get(path) {
            return Ok(ec.clone());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::from(EasyconfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                Error::io_with_path(&e, path)
            }
        })?;
        let ec = parse_easyconfig_str(&contents, &path.display().to_string())?;
        self.parsed
            .borrow_mut()
            .insert(path.to_path_buf(), ec.clone());
        Ok(ec)
    }

    fn roots(&self) -> &[PathBuf] {
        &self.paths
    }

    fn candidates(
        &self,
        prefix_stub: &str,
        toolchain: Option<&ToolchainRef>,
    ) -> Result<Vec<PathBuf>, Error> {
        Ok(candidates_below(prefix_stub, toolchain, &self.paths, &self.options))
    }
}

/// In-memory easyconfigs keyed by their canonical file name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: HashMap<PathBuf, EasyConfig>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; returns the virtual path it is reachable under
    pub fn insert(&mut self, ec: EasyConfig) -> PathBuf {
        let path = Self::path_for(&ec.name, &ec.full_version());
        self.records.insert(path.clone(), ec);
        path
    }

    #[must_use]
    pub fn with(mut self, ec: EasyConfig) -> Self {
        self.insert(ec);
        self
    }

    /// Virtual path of the easyconfig for `name` at `full_version`
    #[must_use]
    pub fn path_for(name: &str, full_version: &str) -> PathBuf {
        PathBuf::from(format!("memory/{name}-{full_version}.eb"))
    }

    /// Every stored record, sorted by path
    #[must_use]
    pub fn records(&self) -> Vec<(&PathBuf, &EasyConfig)> {
        let mut all: Vec<_> = self.records.iter().collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

impl EasyconfigSource for MemorySource {
    fn find_easyconfig(&self, name: &str, full_version: &str) -> Result<Option<PathBuf>, Error> {
        let path = Self::path_for(name, full_version);
        Ok(self.records.contains_key(&path).then_some(path))
    }

    fn parse_easyconfig(&self, path: &Path) -> Result<EasyConfig, Error> {
        self.records.get(path).cloned().ok_or_else(|| {
            EasyconfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into()
        })
    }

    fn candidates(
        &self,
        prefix_stub: &str,
        toolchain: Option<&ToolchainRef>,
    ) -> Result<Vec<PathBuf>, Error> {
        let toolchain_suffix = toolchain.map(ToolchainRef::version_suffix).unwrap_or_default();
        let matches = |path: &PathBuf| {
            path.file_name()
                .map(|n| n.to_string_lossy())
                .is_some_and(|n| {
                    n.strip_prefix(prefix_stub)
                        .is_some_and(|rest| rest.contains(&toolchain_suffix))
                })
        };
        let mut found: Vec<PathBuf> = self.records.keys().filter(|p| matches(p)).cloned().collect();
        found.sort();
        Ok(found)
    }
}
