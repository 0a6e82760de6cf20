//! Operations context for dependency injection

use hpcstack_config::{Config, SearchConfig};
use hpcstack_errors::{Error, OpsError};
use hpcstack_events::{EventEmitter, EventSender};
use hpcstack_index::{
    det_robot_path, EasyconfigSource, ModulePathScanner, ModulesTool, RobotPath, SearchOptions,
};
use hpcstack_resolver::{ResolveOptions, WrapperPolicy};
use hpcstack_toolchain::{
    HierarchyBuilder, HierarchyCache, HierarchyMapper, PairedDependencyPolicy, ToolchainRegistry,
};
use hpcstack_tweak::{SuffixMapper, VersionSuffixCache};
use std::path::PathBuf;

/// Operations context providing access to all collaborators
pub struct OpsCtx {
    /// Effective configuration
    pub config: Config,
    /// Toolchain definitions
    pub registry: ToolchainRegistry,
    /// Where easyconfigs are looked up
    pub source: Box<dyn EasyconfigSource>,
    /// Installed modules
    pub modules: Box<dyn ModulesTool>,
    pub hierarchy_cache: HierarchyCache,
    pub suffix_cache: VersionSuffixCache,
    /// Event sender for progress reporting
    pub tx: EventSender,
}

impl OpsCtx {
    // No public constructor - use OpsContextBuilder instead

    /// Resolver switches derived from configuration
    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            robot: self.config.robot.enabled,
            retain_all: self.config.resolve.retain_all_deps,
            tolerate_missing_easyconfigs: self.config.resolve.tolerate_missing_easyconfigs,
        }
    }

    /// Hierarchy builder sharing this context's cache
    #[must_use]
    pub fn hierarchy_builder(&self) -> HierarchyBuilder<'_> {
        HierarchyBuilder::new(&self.registry, self.source.as_ref())
            .with_cache(&self.hierarchy_cache)
            .with_system_toolchain(self.config.toolchain.add_system_to_minimal_toolchains)
            .with_event_sender(Some(self.tx.clone()))
    }

    /// Hierarchy mapper on top of `builder`
    #[must_use]
    pub fn hierarchy_mapper<'a>(&'a self, builder: &'a HierarchyBuilder<'a>) -> HierarchyMapper<'a> {
        HierarchyMapper::new(builder, self.modules.as_ref())
            .with_carry_over(self.carry_over_policy())
            .with_event_sender(Some(self.tx.clone()))
    }

    /// Versionsuffix mapper on top of `builder` sharing this context's cache
    #[must_use]
    pub fn suffix_mapper<'a>(&'a self, builder: &'a HierarchyBuilder<'a>) -> SuffixMapper<'a> {
        SuffixMapper::new(builder)
            .with_cache(&self.suffix_cache)
            .with_event_sender(Some(self.tx.clone()))
    }

    #[must_use]
    pub fn carry_over_policy(&self) -> Option<PairedDependencyPolicy> {
        PairedDependencyPolicy::from_config(&self.config.toolchain.carry_over)
    }

    #[must_use]
    pub fn wrapper_policy(&self) -> WrapperPolicy {
        WrapperPolicy::new(self.config.conflicts.wrapper_easyblock.clone())
    }

    #[must_use]
    pub fn search_options(&self) -> SearchOptions {
        search_options(&self.config.search)
    }

    /// Forget memoised hierarchies and versionsuffix mappings
    pub fn clear_caches(&self) {
        self.hierarchy_cache.clear();
        self.suffix_cache.clear();
    }
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

/// Search filters from the `[search]` section
#[must_use]
pub fn search_options(config: &SearchConfig) -> SearchOptions {
    SearchOptions {
        ignore_dirs: config.ignore_dirs.clone(),
        archive_dir: config.archive_dir.clone(),
        include_archived: config.include_archived,
    }
}

/// Robot search path in priority order from the `[robot]` section
#[must_use]
pub fn robot_paths(config: &Config) -> Vec<PathBuf> {
    det_robot_path(
        &config.robot.paths,
        config.robot.tweaked_path.as_deref(),
        config.robot.pr_path.as_deref(),
    )
}

/// Builder for operations context
pub struct OpsContextBuilder {
    config: Option<Config>,
    registry: Option<ToolchainRegistry>,
    source: Option<Box<dyn EasyconfigSource>>,
    modules: Option<Box<dyn ModulesTool>>,
    tx: Option<EventSender>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            registry: None,
            source: None,
            modules: None,
            tx: None,
        }
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set toolchain registry; built from configuration when absent
    #[must_use]
    pub fn with_registry(mut self, registry: ToolchainRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set easyconfig source; the configured robot path when absent
    #[must_use]
    pub fn with_source(mut self, source: impl EasyconfigSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Set modules tool; a scan of the configured module paths when absent
    #[must_use]
    pub fn with_modules(mut self, modules: impl ModulesTool + 'static) -> Self {
        self.modules = Some(Box::new(modules));
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or the event sender is missing,
    /// or the configured toolchain definitions are invalid.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let config = self.config.ok_or_else(|| OpsError::MissingComponent {
            component: "config".to_string(),
        })?;
        let tx = self.tx.ok_or_else(|| OpsError::MissingComponent {
            component: "event sender".to_string(),
        })?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => ToolchainRegistry::from_config(&config.toolchain)?,
        };
        let source = self.source.unwrap_or_else(|| {
            Box::new(RobotPath::new(
                robot_paths(&config),
                search_options(&config.search),
            ))
        });
        let modules = self
            .modules
            .unwrap_or_else(|| Box::new(ModulePathScanner::new(config.modules.paths.clone())));

        for root in source.roots().iter().filter(|root| !root.is_dir()) {
            tx.emit_warning("robot path does not exist", root.display().to_string());
        }

        tracing::debug!(
            roots = source.roots().len(),
            toolchains = registry.names().count(),
            "operations context ready"
        );

        Ok(OpsCtx {
            config,
            registry,
            source,
            modules,
            hierarchy_cache: HierarchyCache::new(),
            suffix_cache: VersionSuffixCache::new(),
            tx,
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcstack_index::{MemorySource, StaticModules};

    #[test]
    fn test_missing_components_are_reported() {
        let (tx, _rx) = hpcstack_events::channel();
        let err = OpsContextBuilder::new()
            .with_event_sender(tx)
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("config"));

        let err = OpsContextBuilder::new()
            .with_config(Config::default())
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("event sender"));
    }

    #[test]
    fn test_options_follow_config() {
        let (tx, _rx) = hpcstack_events::channel();
        let mut config = Config::default();
        config.robot.enabled = false;
        config.resolve.retain_all_deps = true;
        config.toolchain.carry_over.enabled = false;
        let ctx = OpsContextBuilder::new()
            .with_config(config)
            .with_source(MemorySource::new())
            .with_modules(StaticModules::default())
            .with_event_sender(tx)
            .build()
            .unwrap();

        let options = ctx.resolve_options();
        assert!(!options.robot);
        assert!(options.retain_all);
        assert!(ctx.carry_over_policy().is_none());
    }

    #[test]
    fn test_missing_robot_path_warns() {
        let (tx, mut rx) = hpcstack_events::channel();
        let mut config = Config::default();
        config.robot.paths = vec![PathBuf::from("/nonexistent/hpcstack-ecs")];
        OpsContextBuilder::new()
            .with_config(config)
            .with_modules(StaticModules::default())
            .with_event_sender(tx)
            .build()
            .unwrap();

        let message = rx.try_recv().unwrap();
        match message.event {
            hpcstack_events::AppEvent::General(hpcstack_events::GeneralEvent::Warning {
                context,
                ..
            }) => assert_eq!(context, "/nonexistent/hpcstack-ecs"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_robot_paths_put_tweaked_first() {
        let mut config = Config::default();
        config.robot.paths = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        config.robot.tweaked_path = Some(PathBuf::from("/tweaked"));
        assert_eq!(
            robot_paths(&config),
            vec![
                PathBuf::from("/tweaked"),
                PathBuf::from("/a"),
                PathBuf::from("/b")
            ]
        );
    }
}
