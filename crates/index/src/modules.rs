//! Module availability

use hpcstack_errors::Error;
use std::collections::BTreeSet;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Access to the modules that are already installed
pub trait ModulesTool {
    /// Full names (`name/version`) of every available module
    ///
    /// # Errors
    ///
    /// Returns an error if the module tool cannot be queried.
    fn available(&self) -> Result<BTreeSet<String>, Error>;

    /// Whether a module exists; a bare `name` matches any `name/<version>`
    ///
    /// # Errors
    ///
    /// Returns an error if the module tool cannot be queried.
    fn exists(&self, mod_name: &str) -> Result<bool, Error> {
        let available = self.available()?;
        Ok(module_in_set(&available, mod_name))
    }
}

fn module_in_set(available: &BTreeSet<String>, mod_name: &str) -> bool {
    if available.contains(mod_name) {
        return true;
    }
    let prefix = format!("{mod_name}/");
    available
        .range(prefix.clone()..)
        .next()
        .is_some_and(|m| m.starts_with(&prefix))
}

/// A fixed set of module names
#[derive(Debug, Clone, Default)]
pub struct StaticModules {
    modules: BTreeSet<String>,
}

impl StaticModules {
    #[must_use]
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, module: impl Into<String>) {
        self.modules.insert(module.into());
    }
}

impl ModulesTool for StaticModules {
    fn available(&self) -> Result<BTreeSet<String>, Error> {
        Ok(self.modules.clone())
    }
}

/// Lists module files found below module path roots
///
/// A file at `<root>/zlib/1.2.11-GCCcore-7.3.0` (or with a `.lua` extension)
/// yields the module `zlib/1.2.11-GCCcore-7.3.0`. `.modulerc` and `.version`
/// files are skipped; hidden `.<version>` files are listed as such.
#[derive(Debug, Clone)]
pub struct ModulePathScanner {
    roots: Vec<PathBuf>,
}

impl ModulePathScanner {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ModulesTool for ModulePathScanner {
    fn available(&self) -> Result<BTreeSet<String>, Error> {
        let mut modules = BTreeSet::new();

        for root in &self.roots {
            if !root.is_dir() {
                tracing::debug!(root = %root.display(), "module path does not exist");
                continue;
            }
            for entry in WalkDir::new(root).follow_links(true).min_depth(2) {
                let entry = entry.map_err(|e| {
                    let io = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("module path walk failed"));
                    Error::io_with_path(&io, root)
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy();
                if file_name == ".version" || file_name.starts_with(".modulerc") {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(root) else {
                    continue;
                };
                let rel = rel.to_string_lossy().replace('\\', "/");
                let name = rel.strip_suffix(".lua").unwrap_or(&rel);
                modules.insert(name.to_string());
            }
        }
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_exists_matches_partial_name() {
        let modules = StaticModules::new(["cray-libsci/18.12.1", "zlib/1.2.11"]);
        assert!(modules.exists("zlib/1.2.11").unwrap());
        assert!(modules.exists("cray-libsci").unwrap());
        assert!(!modules.exists("cray").unwrap());
        assert!(!modules.exists("zlib/1.2.8").unwrap());
    }

    #[test]
    fn test_scanner_lists_tcl_and_lua_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "zlib/1.2.11-GCCcore-7.3.0",
            "GCC/7.3.0-2.30.lua",
            "GCC/.version",
            "GCC/.modulerc.lua",
            "Szip/.2.1.1-GCCcore-7.3.0",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "#%Module").unwrap();
        }

        let scanner = ModulePathScanner::new(vec![root.to_path_buf(), root.join("missing")]);
        let available = scanner.available().unwrap();
        assert_eq!(
            available.into_iter().collect::<Vec<_>>(),
            vec![
                "GCC/7.3.0-2.30".to_string(),
                "Szip/.2.1.1-GCCcore-7.3.0".to_string(),
                "zlib/1.2.11-GCCcore-7.3.0".to_string(),
            ]
        );
    }
}
