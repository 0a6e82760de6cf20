use serde::{Deserialize, Serialize};

/// Dependency resolution and conflict checking events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolverEvent {
    /// Resolution of a batch of easyconfigs started
    ResolutionStarted {
        requested: Vec<String>,
        robot_enabled: bool,
        retain_all: bool,
    },

    /// A record had all its dependencies satisfied and joined the plan
    RecordResolved { module: String },

    /// The robot looked up an easyconfig for a pending dependency
    RobotLookup {
        module: String,
        path: Option<String>,
    },

    /// A dependency module exists but no easyconfig was found for it
    MissingEasyconfig { module: String },

    /// Neither a module nor an easyconfig exists for a dependency
    TotallyMissing { module: String },

    /// A requested easyconfig was dropped because its module exists
    AlreadyInstalled { module: String },

    /// Resolution finished with an ordered plan
    ResolutionCompleted { planned: usize, placeholders: usize },

    /// Two versions of the same package meet in one dependency graph
    ConflictDetected { message: String },

    /// Conflict check over the full graph finished
    ConflictCheckCompleted { nodes: usize, conflicts: usize },
}

impl ResolverEvent {
    /// Whether the event signals a condition the user should act on
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::MissingEasyconfig { .. } | Self::TotallyMissing { .. } | Self::ConflictDetected { .. }
        )
    }
}
