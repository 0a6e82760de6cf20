//! Known toolchain definitions

use hpcstack_config::ToolchainConfig;
use hpcstack_errors::{ConfigError, Error};
use hpcstack_types::{Capability, CapabilitySet, SYSTEM_TOOLCHAIN_NAME};
use serde::Serialize;
use std::collections::BTreeMap;

/// How a toolchain is composed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolchainDefinition {
    pub name: String,
    /// Direct sub-toolchains; `system` may appear as the bottom
    pub subtoolchains: Vec<String>,
    /// May be missing from the dependencies of a parent toolchain
    pub optional: bool,
    pub capabilities: CapabilitySet,
}

impl ToolchainDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, subtoolchains: &[&str], capabilities: CapabilitySet) -> Self {
        Self {
            name: name.into(),
            subtoolchains: subtoolchains.iter().map(ToString::to_string).collect(),
            optional: false,
            capabilities,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Combines a compiler with further layers (MPI, maths, CUDA); versions of
    /// such toolchains follow a release name rather than a compiler version
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.capabilities
            .provided()
            .any(|cap| cap != Capability::Compiler)
    }
}

/// Table of toolchain definitions by name
#[derive(Clone, Debug)]
pub struct ToolchainRegistry {
    definitions: BTreeMap<String, ToolchainDefinition>,
}

impl Default for ToolchainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn caps(compiler: &str) -> CapabilitySet {
    CapabilitySet::default().with(Capability::Compiler, compiler)
}

fn with_mpi(set: CapabilitySet, mpi: &str) -> CapabilitySet {
    set.with(Capability::Mpi, mpi)
}

fn with_maths(set: CapabilitySet, blas: &str, scalapack: Option<&str>, fft: &str) -> CapabilitySet {
    let set = set
        .with(Capability::Blas, blas)
        .with(Capability::Lapack, blas)
        .with(Capability::Fft, fft);
    match scalapack {
        Some(family) => set.with(Capability::Scalapack, family),
        None => set,
    }
}

fn with_cuda(set: CapabilitySet) -> CapabilitySet {
    set.with(Capability::Cuda, "CUDA")
}

impl ToolchainRegistry {
    /// Registry without any definitions except `system`
    #[must_use]
    pub fn empty() -> Self {
        let mut registry = Self {
            definitions: BTreeMap::new(),
        };
        registry.insert(ToolchainDefinition::new(
            SYSTEM_TOOLCHAIN_NAME,
            &[],
            CapabilitySet::default(),
        ));
        registry
    }

    /// The common compiler, MPI and maths toolchain families
    #[must_use]
    pub fn builtin() -> Self {
        let gcc = || caps("GCC");
        let intel = || caps("Intel");
        let mut registry = Self::empty();

        for def in [
            ToolchainDefinition::new("GCCcore", &[SYSTEM_TOOLCHAIN_NAME], gcc()).optional(),
            ToolchainDefinition::new("GCC", &["GCCcore", SYSTEM_TOOLCHAIN_NAME], gcc()),
            ToolchainDefinition::new("iccifort", &["GCCcore", SYSTEM_TOOLCHAIN_NAME], intel()),
            ToolchainDefinition::new("gcccuda", &["GCC"], with_cuda(gcc())),
            ToolchainDefinition::new("iccifortcuda", &["iccifort"], with_cuda(intel())),
            ToolchainDefinition::new("gompi", &["GCC"], with_mpi(gcc(), "OpenMPI")),
            ToolchainDefinition::new("gompic", &["gcccuda"], with_cuda(with_mpi(gcc(), "OpenMPI"))),
            ToolchainDefinition::new("gimpi", &["GCC"], with_mpi(gcc(), "IntelMPI")),
            ToolchainDefinition::new("iimpi", &["iccifort"], with_mpi(intel(), "IntelMPI")),
            ToolchainDefinition::new(
                "iimpic",
                &["iccifortcuda"],
                with_cuda(with_mpi(intel(), "IntelMPI")),
            ),
            ToolchainDefinition::new("iompi", &["iccifort"], with_mpi(intel(), "OpenMPI")),
            ToolchainDefinition::new(
                "golf",
                &["GCC"],
                with_maths(gcc(), "OpenBLAS", None, "FFTW"),
            )
            .optional(),
            ToolchainDefinition::new(
                "iimkl",
                &["iccifort"],
                with_maths(intel(), "IntelMKL", None, "IntelFFTW"),
            )
            .optional(),
            ToolchainDefinition::new(
                "foss",
                &["gompi", "golf"],
                with_maths(with_mpi(gcc(), "OpenMPI"), "OpenBLAS", Some("ScaLAPACK"), "FFTW"),
            ),
            ToolchainDefinition::new(
                "fosscuda",
                &["gompic"],
                with_cuda(with_maths(
                    with_mpi(gcc(), "OpenMPI"),
                    "OpenBLAS",
                    Some("ScaLAPACK"),
                    "FFTW",
                )),
            ),
            ToolchainDefinition::new(
                "gomkl",
                &["gompi"],
                with_maths(with_mpi(gcc(), "OpenMPI"), "IntelMKL", Some("IntelMKL"), "IntelFFTW"),
            ),
            ToolchainDefinition::new(
                "intel",
                &["iimpi", "iimkl"],
                with_maths(with_mpi(intel(), "IntelMPI"), "IntelMKL", Some("IntelMKL"), "IntelFFTW"),
            ),
            ToolchainDefinition::new(
                "iomkl",
                &["iompi"],
                with_maths(with_mpi(intel(), "OpenMPI"), "IntelMKL", Some("IntelMKL"), "IntelFFTW"),
            ),
            ToolchainDefinition::new(
                "intelcuda",
                &["iimpic"],
                with_cuda(with_maths(
                    with_mpi(intel(), "IntelMPI"),
                    "IntelMKL",
                    Some("IntelMKL"),
                    "IntelFFTW",
                )),
            ),
        ] {
            registry.insert(def);
        }
        registry
    }

    /// Built-in definitions extended (or overridden) by configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configured definition uses an unknown
    /// capability key or names an unknown sub-toolchain.
    pub fn from_config(config: &ToolchainConfig) -> Result<Self, Error> {
        let mut registry = Self::builtin();
        for (name, def) in &config.definitions {
            let mut capabilities = CapabilitySet::default();
            for (key, family) in &def.capabilities {
                let cap = Capability::from_key(key).ok_or_else(|| ConfigError::UnknownCapability {
                    toolchain: name.clone(),
                    key: key.clone(),
                })?;
                capabilities.set(cap, Some(family.clone()));
            }
            registry.insert(ToolchainDefinition {
                name: name.clone(),
                subtoolchains: def.subtoolchains.clone(),
                optional: def.optional,
                capabilities,
            });
        }

        for def in registry.definitions.values() {
            for sub in &def.subtoolchains {
                if !registry.definitions.contains_key(sub) {
                    return Err(ConfigError::UnknownToolchain { name: sub.clone() }.into());
                }
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, definition: ToolchainDefinition) {
        self.definitions
            .insert(definition.name.clone(), definition);
    }

    /// Look up a definition
    ///
    /// # Errors
    ///
    /// Returns an error if no toolchain with this name is known.
    pub fn get(&self, name: &str) -> Result<&ToolchainDefinition, Error> {
        self.definitions.get(name).ok_or_else(|| {
            ConfigError::UnknownToolchain {
                name: name.to_string(),
            }
            .into()
        })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Capabilities of a toolchain; the system toolchain provides none
    ///
    /// # Errors
    ///
    /// Returns an error if the toolchain is unknown.
    pub fn capabilities(&self, name: &str) -> Result<CapabilitySet, Error> {
        Ok(self.get(name)?.capabilities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcstack_config::ToolchainDefinitionConfig;

    #[test]
    fn test_builtin_shapes() {
        let registry = ToolchainRegistry::builtin();
        let foss = registry.get("foss").unwrap();
        assert_eq!(foss.subtoolchains, vec!["gompi", "golf"]);
        assert!(foss.is_composite());
        assert!(!registry.get("GCC").unwrap().is_composite());
        assert!(registry.get("GCCcore").unwrap().optional);
        assert!(registry.capabilities(SYSTEM_TOOLCHAIN_NAME).unwrap().is_empty());
        assert!(registry.get("nosuchtc").is_err());
    }

    #[test]
    fn test_config_definitions() {
        let mut config = ToolchainConfig::default();
        config.definitions.insert(
            "gmpich".to_string(),
            ToolchainDefinitionConfig {
                subtoolchains: vec!["GCC".to_string()],
                optional: false,
                capabilities: [
                    ("compiler".to_string(), "GCC".to_string()),
                    ("mpi".to_string(), "MPICH".to_string()),
                ]
                .into(),
            },
        );
        let registry = ToolchainRegistry::from_config(&config).unwrap();
        let gmpich = registry.get("gmpich").unwrap();
        assert_eq!(gmpich.capabilities.get(Capability::Mpi), Some("MPICH"));

        config
            .definitions
            .get_mut("gmpich")
            .unwrap()
            .capabilities
            .insert("quantum".to_string(), "yes".to_string());
        let err = ToolchainRegistry::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnknownCapability { ref key, .. }) if key == "quantum"
        ));
    }

    #[test]
    fn test_config_rejects_unknown_subtoolchain() {
        let mut config = ToolchainConfig::default();
        config.definitions.insert(
            "odd".to_string(),
            ToolchainDefinitionConfig {
                subtoolchains: vec!["missing".to_string()],
                ..ToolchainDefinitionConfig::default()
            },
        );
        assert!(ToolchainRegistry::from_config(&config).is_err());
    }
}
