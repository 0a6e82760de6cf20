#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Easyconfig index for hpcstack
//!
//! This crate finds easyconfig files below the robot search path, parses
//! their YAML form, and reports which modules are already installed.
//! Everything here is synchronous; callers that run inside an async runtime
//! move the work onto a blocking thread.

mod format;
mod modules;
mod search;
mod source;

pub use format::{easyconfig_to_yaml, parse_easyconfig_str, EXTERNAL_MODULE_MARKER};
pub use modules::{ModulePathScanner, ModulesTool, StaticModules};
pub use search::{
    det_robot_path, find_matching_easyconfigs, get_matching_easyconfig_candidates,
    search_easyconfigs, search_files, SearchOptions,
};
pub use source::{EasyconfigSource, MemorySource, RobotPath};
