use serde::{Deserialize, Serialize};

/// Version selection and easyconfig tweaking events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TweakEvent {
    /// A version was picked among the available candidates
    VersionPicked {
        name: String,
        required: Option<String>,
        selected: String,
    },

    /// A versionsuffix is rewritten for the target toolchain
    SuffixMapped { from: String, to: String },

    /// A record was rewritten to target another toolchain
    RecordTweaked { from: String, to: String },

    /// An easyconfig was selected, or generated from a template, for a request
    EasyconfigObtained {
        module: String,
        template: String,
        generated: bool,
    },
}
