//! Easyconfig records and dependency references

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::toolchain::ToolchainRef;

/// File extension used for easyconfig files
pub const EASYCONFIG_EXTENSION: &str = "eb";

/// Compose `versionprefix + version + toolchain suffix + versionsuffix`
#[must_use]
pub fn det_full_version(
    versionprefix: &str,
    version: &str,
    toolchain: &ToolchainRef,
    versionsuffix: &str,
) -> String {
    format!(
        "{versionprefix}{version}{}{versionsuffix}",
        toolchain.version_suffix()
    )
}

/// Module name in `name/version` form, `name/.version` when hidden
#[must_use]
pub fn det_module_name(name: &str, full_version: &str, hidden: bool) -> String {
    if hidden {
        format!("{name}/.{full_version}")
    } else {
        format!("{name}/{full_version}")
    }
}

/// Identity of a package install: `(name, full install version)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecKey {
    pub name: String,
    pub full_version: String,
}

impl SpecKey {
    #[must_use]
    pub fn new(name: impl Into<String>, full_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_version: full_version.into(),
        }
    }
}

impl fmt::Display for SpecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.full_version)
    }
}

/// A dependency as listed in an easyconfig
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub versionsuffix: String,
    #[serde(default)]
    pub toolchain: ToolchainRef,
    #[serde(default)]
    pub external_module: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Dependency {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        toolchain: ToolchainRef,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            versionsuffix: String::new(),
            toolchain,
            external_module: false,
            hidden: false,
        }
    }

    #[must_use]
    pub fn with_suffix(mut self, versionsuffix: impl Into<String>) -> Self {
        self.versionsuffix = versionsuffix.into();
        self
    }

    /// Dependency on a module provided outside of hpcstack
    #[must_use]
    pub fn external(module: impl Into<String>) -> Self {
        Self {
            name: module.into(),
            version: String::new(),
            versionsuffix: String::new(),
            toolchain: ToolchainRef::system(),
            external_module: true,
            hidden: false,
        }
    }

    /// Implicit dependency on a (non-system) toolchain module
    #[must_use]
    pub fn for_toolchain(toolchain: &ToolchainRef) -> Self {
        Self::new(&toolchain.name, &toolchain.version, ToolchainRef::system())
    }

    #[must_use]
    pub fn full_version(&self) -> String {
        det_full_version("", &self.version, &self.toolchain, &self.versionsuffix)
    }

    #[must_use]
    pub fn full_mod_name(&self) -> String {
        if self.external_module {
            if self.version.is_empty() || self.name.contains('/') {
                self.name.clone()
            } else {
                format!("{}/{}", self.name, self.version)
            }
        } else {
            det_module_name(&self.name, &self.full_version(), self.hidden)
        }
    }

    #[must_use]
    pub fn spec_key(&self) -> SpecKey {
        SpecKey::new(&self.name, self.full_version())
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_mod_name())
    }
}

/// A parsed easyconfig record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasyConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub versionprefix: String,
    #[serde(default)]
    pub versionsuffix: String,
    #[serde(default)]
    pub toolchain: ToolchainRef,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub builddependencies: Vec<Dependency>,
    /// Alternative versions per dependency name; alternative `i` combines the
    /// `i`-th version of every entry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub multi_deps: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easyblock: Option<String>,
}

impl EasyConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, toolchain: ToolchainRef) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            versionprefix: String::new(),
            versionsuffix: String::new(),
            toolchain,
            dependencies: Vec::new(),
            builddependencies: Vec::new(),
            multi_deps: BTreeMap::new(),
            hidden: false,
            easyblock: None,
        }
    }

    #[must_use]
    pub fn full_version(&self) -> String {
        det_full_version(
            &self.versionprefix,
            &self.version,
            &self.toolchain,
            &self.versionsuffix,
        )
    }

    #[must_use]
    pub fn full_mod_name(&self) -> String {
        det_module_name(&self.name, &self.full_version(), self.hidden)
    }

    #[must_use]
    pub fn spec_key(&self) -> SpecKey {
        SpecKey::new(&self.name, self.full_version())
    }

    /// Canonical file name: `<name>-<full version>.eb`
    #[must_use]
    pub fn filename(&self) -> String {
        format!(
            "{}-{}.{EASYCONFIG_EXTENSION}",
            self.name,
            self.full_version()
        )
    }

    /// Number of `multi_deps` alternatives, `None` when the lists disagree
    #[must_use]
    pub fn multi_deps_len(&self) -> Option<usize> {
        let mut lens = self.multi_deps.values().map(Vec::len);
        let first = lens.next().unwrap_or(0);
        lens.all(|len| len == first).then_some(first)
    }

    /// Build dependencies of `multi_deps` alternative `index`
    #[must_use]
    pub fn multi_deps_alternative(&self, index: usize) -> Vec<Dependency> {
        self.multi_deps
            .iter()
            .filter_map(|(name, versions)| {
                versions
                    .get(index)
                    .map(|version| Dependency::new(name, version, self.toolchain.clone()))
            })
            .collect()
    }

    /// Every dependency that must be installed before this record can be built:
    /// runtime, build, every `multi_deps` alternative, then the toolchain itself
    #[must_use]
    pub fn all_dependencies(&self) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .dependencies
            .iter()
            .chain(self.builddependencies.iter())
            .cloned()
            .collect();

        for index in 0..self.multi_deps_len().unwrap_or(0) {
            for dep in self.multi_deps_alternative(index) {
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
        }

        if !self.toolchain.is_system() {
            deps.push(Dependency::for_toolchain(&self.toolchain));
        }
        deps
    }
}

impl fmt::Display for EasyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.full_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foss() -> ToolchainRef {
        ToolchainRef::new("foss", "2018b")
    }

    #[test]
    fn test_full_version() {
        let mut ec = EasyConfig::new("HDF5", "1.10.1", foss());
        ec.versionsuffix = "-serial".into();
        assert_eq!(ec.full_version(), "1.10.1-foss-2018b-serial");
        assert_eq!(ec.full_mod_name(), "HDF5/1.10.1-foss-2018b-serial");
        assert_eq!(ec.filename(), "HDF5-1.10.1-foss-2018b-serial.eb");

        let sys = EasyConfig::new("zlib", "1.2.11", ToolchainRef::system());
        assert_eq!(sys.full_version(), "1.2.11");
    }

    #[test]
    fn test_hidden_module_name() {
        let mut dep = Dependency::new("zlib", "1.2.11", ToolchainRef::new("GCCcore", "7.3.0"));
        dep.hidden = true;
        assert_eq!(dep.full_mod_name(), "zlib/.1.2.11-GCCcore-7.3.0");
    }

    #[test]
    fn test_external_module_name() {
        assert_eq!(Dependency::external("cray-libsci").full_mod_name(), "cray-libsci");
        let mut ext = Dependency::external("cray-netcdf");
        ext.version = "4.6.1".into();
        assert_eq!(ext.full_mod_name(), "cray-netcdf/4.6.1");
        assert_eq!(Dependency::external("cuda/9.2").full_mod_name(), "cuda/9.2");
    }

    #[test]
    fn test_toolchain_is_implicit_dependency() {
        let ec = EasyConfig::new("gzip", "1.8", ToolchainRef::new("GCC", "4.9.3"));
        let deps = ec.all_dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].full_mod_name(), "GCC/4.9.3");

        let sys = EasyConfig::new("GCC", "4.9.3", ToolchainRef::system());
        assert!(sys.all_dependencies().is_empty());
    }

    #[test]
    fn test_multi_deps_alternatives() {
        let mut ec = EasyConfig::new("Boost", "1.67.0", foss());
        ec.multi_deps
            .insert("Python".into(), vec!["3.6.6".into(), "2.7.15".into()]);
        assert_eq!(ec.multi_deps_len(), Some(2));
        let alt = ec.multi_deps_alternative(1);
        assert_eq!(alt[0].full_mod_name(), "Python/2.7.15-foss-2018b");
        // both alternatives plus the toolchain
        assert_eq!(ec.all_dependencies().len(), 3);

        ec.multi_deps.insert("SciPy-bundle".into(), vec!["2018.11".into()]);
        assert_eq!(ec.multi_deps_len(), None);
    }
}
