//! Toolchain references, capability sets and hierarchy entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the pseudo-toolchain meaning "built with the system compiler"
pub const SYSTEM_TOOLCHAIN_NAME: &str = "system";

/// A `(name, version)` toolchain reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolchainRef {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl ToolchainRef {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// The system toolchain sentinel
    #[must_use]
    pub fn system() -> Self {
        Self::new(SYSTEM_TOOLCHAIN_NAME, "")
    }

    /// Whether this is the system toolchain
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.name == SYSTEM_TOOLCHAIN_NAME
    }

    /// Suffix added to install versions: empty for system, else `-<name>-<version>`
    #[must_use]
    pub fn version_suffix(&self) -> String {
        if self.is_system() {
            String::new()
        } else {
            format!("-{}-{}", self.name, self.version)
        }
    }

    /// Parse `NAME/VERSION` (or `system`)
    #[must_use]
    pub fn parse_spec(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case(SYSTEM_TOOLCHAIN_NAME) {
            return Some(Self::system());
        }
        let (name, version) = input.split_once('/')?;
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self::new(name, version))
    }
}

impl Default for ToolchainRef {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Display for ToolchainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_system() {
            f.write_str(SYSTEM_TOOLCHAIN_NAME)
        } else {
            write!(f, "{}/{}", self.name, self.version)
        }
    }
}

/// Capabilities a toolchain can provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Compiler,
    Mpi,
    Blas,
    Lapack,
    Scalapack,
    Fft,
    Cuda,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Self::Compiler,
        Self::Mpi,
        Self::Blas,
        Self::Lapack,
        Self::Scalapack,
        Self::Fft,
        Self::Cuda,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compiler => "compiler",
            Self::Mpi => "mpi",
            Self::Blas => "blas",
            Self::Lapack => "lapack",
            Self::Scalapack => "scalapack",
            Self::Fft => "fft",
            Self::Cuda => "cuda",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.as_str() == key)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability families a toolchain provides, one optional slot per capability
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lapack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalapack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fft: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuda: Option<String>,
}

impl CapabilitySet {
    /// Family providing the given capability
    #[must_use]
    pub fn get(&self, cap: Capability) -> Option<&str> {
        let slot = match cap {
            Capability::Compiler => &self.compiler,
            Capability::Mpi => &self.mpi,
            Capability::Blas => &self.blas,
            Capability::Lapack => &self.lapack,
            Capability::Scalapack => &self.scalapack,
            Capability::Fft => &self.fft,
            Capability::Cuda => &self.cuda,
        };
        slot.as_deref()
    }

    /// Set a capability; empty family names clear the slot
    pub fn set(&mut self, cap: Capability, family: Option<String>) {
        let family = family.filter(|f| !f.trim().is_empty());
        let slot = match cap {
            Capability::Compiler => &mut self.compiler,
            Capability::Mpi => &mut self.mpi,
            Capability::Blas => &mut self.blas,
            Capability::Lapack => &mut self.lapack,
            Capability::Scalapack => &mut self.scalapack,
            Capability::Fft => &mut self.fft,
            Capability::Cuda => &mut self.cuda,
        };
        *slot = family;
    }

    #[must_use]
    pub fn with(mut self, cap: Capability, family: impl Into<String>) -> Self {
        self.set(cap, Some(family.into()));
        self
    }

    /// Empty strings read from files become `None`
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for cap in Capability::ALL {
            let current = self.get(cap).map(str::to_string);
            self.set(cap, current);
        }
        self
    }

    /// Capabilities with a family set
    pub fn provided(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.get(*cap).is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provided().next().is_none()
    }

    /// Union of two sets; the left side wins on conflicts
    #[must_use]
    pub fn merged(&self, other: &CapabilitySet) -> CapabilitySet {
        let mut out = self.clone();
        for cap in other.provided() {
            if out.get(cap).is_none() {
                out.set(cap, other.get(cap).map(str::to_string));
            }
        }
        out
    }
}

/// One level of a toolchain hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyEntry {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp_family: Option<String>,
    #[serde(default, skip_serializing_if = "CapabilitySet::is_empty")]
    pub capabilities: CapabilitySet,
}

impl HierarchyEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            comp_family: None,
            capabilities: CapabilitySet::default(),
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.comp_family = capabilities.compiler.clone();
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn toolchain(&self) -> ToolchainRef {
        ToolchainRef::new(&self.name, &self.version)
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.name == SYSTEM_TOOLCHAIN_NAME
    }
}

impl fmt::Display for HierarchyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.toolchain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_suffix() {
        assert_eq!(ToolchainRef::system().version_suffix(), "");
        assert_eq!(ToolchainRef::new("GCC", "4.9.3").version_suffix(), "-GCC-4.9.3");
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(
            ToolchainRef::parse_spec("foss/2018b"),
            Some(ToolchainRef::new("foss", "2018b"))
        );
        assert_eq!(ToolchainRef::parse_spec("SYSTEM"), Some(ToolchainRef::system()));
        assert_eq!(ToolchainRef::parse_spec("foss"), None);
        assert_eq!(ToolchainRef::parse_spec("foss/"), None);
    }

    #[test]
    fn test_empty_family_is_unset() {
        let caps = CapabilitySet {
            mpi: Some(String::new()),
            ..CapabilitySet::default()
        }
        .normalized();
        assert_eq!(caps.get(Capability::Mpi), None);
        assert!(caps.is_empty());
    }

    #[test]
    fn test_merged_keeps_left() {
        let left = CapabilitySet::default().with(Capability::Compiler, "GCC");
        let right = CapabilitySet::default()
            .with(Capability::Compiler, "Intel")
            .with(Capability::Mpi, "OpenMPI");
        let merged = left.merged(&right);
        assert_eq!(merged.get(Capability::Compiler), Some("GCC"));
        assert_eq!(merged.get(Capability::Mpi), Some("OpenMPI"));
    }

    #[test]
    fn test_capability_keys() {
        for cap in Capability::ALL {
            assert_eq!(Capability::from_key(cap.as_str()), Some(cap));
        }
        assert_eq!(Capability::from_key("gpu"), None);
    }
}
