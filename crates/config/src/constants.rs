//! Fixed names shared by the configuration defaults and the CLI

/// Directory below the platform config dir holding `config.toml`
pub const CONFIG_DIR_NAME: &str = "hpcstack";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Subdirectory of a robot path holding archived easyconfigs
pub const ARCHIVE_DIR_NAME: &str = "__archive__";

/// Directories never descended into while searching easyconfigs
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[".git", ".svn"];

/// Easyblock marking a module that only wraps another one
pub const DEFAULT_WRAPPER_EASYBLOCK: &str = "ModuleRC";

/// Package whose version follows the base compiler toolchain when mapping
pub const DEFAULT_CARRY_OVER_PACKAGE: &str = "binutils";
pub const DEFAULT_BASE_TOOLCHAIN: &str = "GCCcore";

/// Directory below the platform cache dir for debug log files
pub const LOGS_DIR_NAME: &str = "hpcstack/logs";
