use serde::{Deserialize, Serialize};

/// Toolchain hierarchy and mapping events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolchainEvent {
    /// A toolchain hierarchy was computed or served from the cache
    HierarchyBuilt {
        toolchain: String,
        hierarchy: Vec<String>,
        cached: bool,
    },

    /// One source hierarchy entry was mapped onto a target entry
    MappingSelected { source: String, target: String },

    /// Mapping changes the compiler family
    CompilerFamilySwitch {
        source: String,
        target: String,
        from_family: String,
        to_family: String,
    },

    /// A paired dependency version is carried over into the target toolchain
    CarryOver {
        package: String,
        version: String,
        versionsuffix: String,
    },
}
