//! Integration tests for ops crate

#[cfg(test)]
mod tests {
    use hpcstack_config::Config;
    use hpcstack_errors::UserFacingError;
    use hpcstack_events::{AppEvent, EventReceiver, GeneralEvent, ResolverEvent, TweakEvent};
    use hpcstack_index::{MemorySource, StaticModules};
    use hpcstack_ops::*;
    use hpcstack_types::{Dependency, EasyConfig, ToolchainRef};

    fn with_deps(mut ec: EasyConfig, deps: Vec<Dependency>) -> EasyConfig {
        ec.dependencies = deps;
        ec
    }

    /// zlib/gzip, a conflicting pair of Foo versions and two GCC releases
    fn robot() -> MemorySource {
        let system = ToolchainRef::system();
        let mut source = MemorySource::new()
            .with(EasyConfig::new("zlib", "1.2.8", system.clone()))
            .with(with_deps(
                EasyConfig::new("gzip", "1.4", system.clone()),
                vec![Dependency::new("zlib", "1.2.8", system.clone())],
            ))
            .with(EasyConfig::new("Foo", "1.0", system.clone()))
            .with(EasyConfig::new("Foo", "2.0", system.clone()))
            .with(with_deps(
                EasyConfig::new("Bar", "1.0", system.clone()),
                vec![Dependency::new("Foo", "2.0", system.clone())],
            ))
            .with(with_deps(
                EasyConfig::new("App", "1.0", system.clone()),
                vec![
                    Dependency::new("Foo", "1.0", system.clone()),
                    Dependency::new("Bar", "1.0", system.clone()),
                ],
            ));

        for (core, binutils, python) in [("7.3.0", "2.30", "3.6.6"), ("8.2.0", "2.31.1", "3.7.2")] {
            let gcccore = ToolchainRef::new("GCCcore", core);
            let gcc = ToolchainRef::new("GCC", format!("{core}-{binutils}"));
            source.insert(EasyConfig::new("GCCcore", core, system.clone()));
            source.insert(EasyConfig::new("binutils", binutils, gcccore.clone()));
            source.insert(with_deps(
                EasyConfig::new("GCC", gcc.version.clone(), system.clone()),
                vec![
                    Dependency::new("GCCcore", core, system.clone()),
                    Dependency::new("binutils", binutils, gcccore.clone()),
                ],
            ));
            source.insert(EasyConfig::new("zlib", "1.2.11", gcccore.clone()));
            source.insert(with_deps(
                EasyConfig::new("Python", python, gcc.clone()),
                vec![Dependency::new("zlib", "1.2.11", gcccore)],
            ));
        }

        let gcc7 = ToolchainRef::new("GCC", "7.3.0-2.30");
        let mut numpy = EasyConfig::new("numpy", "1.15.0", gcc7.clone());
        numpy.versionsuffix = "-Python-3.6.6".to_string();
        numpy.dependencies.push(Dependency::new("Python", "3.6.6", gcc7));
        source.insert(numpy);
        source
    }

    fn context(modules: &[&str]) -> (OpsCtx, EventReceiver) {
        context_with(Config::default(), modules)
    }

    fn context_with(config: Config, modules: &[&str]) -> (OpsCtx, EventReceiver) {
        let (tx, rx) = hpcstack_events::channel();
        let ctx = OpsContextBuilder::new()
            .with_config(config)
            .with_source(robot())
            .with_modules(StaticModules::new(modules.iter().copied()))
            .with_event_sender(tx)
            .build()
            .unwrap();
        (ctx, rx)
    }

    fn specs(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_resolve_skips_available_dependency() {
        let (ctx, _rx) = context(&["zlib/1.2.8"]);
        let report = resolve(&ctx, &specs(&["gzip-1.4.eb"])).unwrap();
        let order: Vec<&str> = report.order.iter().map(|m| m.module.as_str()).collect();
        assert_eq!(order, vec!["gzip/1.4"]);

        let (ctx, _rx) = context(&[]);
        let report = resolve(&ctx, &specs(&["gzip-1.4"])).unwrap();
        let order: Vec<&str> = report.order.iter().map(|m| m.module.as_str()).collect();
        assert_eq!(order, vec!["zlib/1.2.8", "gzip/1.4"]);
    }

    #[test]
    fn test_unknown_easyconfig_and_empty_request() {
        let (ctx, _rx) = context(&[]);
        let err = resolve(&ctx, &specs(&["nope-1.0.eb"])).unwrap_err();
        assert_eq!(err.user_code(), Some("easyconfig.file_not_found"));

        let err = resolve(&ctx, &[]).unwrap_err();
        assert_eq!(err.user_code(), Some("ops.no_easyconfigs_specified"));
    }

    #[test]
    fn test_dry_run_lists_dependencies() {
        let (ctx, _rx) = context(&["zlib/1.2.8", "gzip/1.4"]);
        let options = DryRunOptions {
            force: true,
            ..DryRunOptions::default()
        };
        let report = dry_run(&ctx, &specs(&["gzip-1.4.eb"]), options).unwrap();
        let rendered = report.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Dry run: printing build status of easyconfigs and dependencies",
                " * [x] memory/zlib-1.2.8.eb (module: zlib/1.2.8)",
                " * [F] memory/gzip-1.4.eb (module: gzip/1.4)",
            ]
        );
    }

    #[test]
    fn test_check_conflicts_reports_both_versions() {
        let (ctx, _rx) = context(&[]);
        let report = check_conflicts(&ctx, &specs(&["App-1.0.eb"])).unwrap();
        assert!(report.conflicts_found);
        assert!(report
            .report
            .messages()
            .iter()
            .any(|m| m.contains("Foo-1.0") && m.contains("Foo-2.0")));
        assert!(!OperationResult::Conflicts(report).is_success());

        let clean = check_conflicts(&ctx, &specs(&["gzip-1.4.eb"])).unwrap();
        assert!(!clean.conflicts_found);
    }

    #[test]
    fn test_hierarchy_and_mapping() {
        let (ctx, _rx) = context(&[]);
        let report = hierarchy(&ctx, "GCC/8.2.0-2.31.1", true).unwrap();
        let levels: Vec<String> = report.levels.iter().map(ToString::to_string).collect();
        assert_eq!(levels, vec!["GCCcore/8.2.0", "GCC/8.2.0-2.31.1"]);
        assert!(!ctx.hierarchy_cache.is_empty());

        let mapping = map_toolchains(&ctx, "GCC/7.3.0-2.30", "GCC/8.2.0-2.31.1").unwrap();
        assert_eq!(
            mapping.mapping.get("GCCcore"),
            Some(&ToolchainRef::new("GCCcore", "8.2.0"))
        );

        ctx.clear_caches();
        assert!(ctx.hierarchy_cache.is_empty());

        let err = hierarchy(&ctx, "GCC", false).unwrap_err();
        assert_eq!(err.user_code(), Some("ops.invalid_toolchain_spec"));
    }

    #[test]
    fn test_pick_version_among_toolchain_builds() {
        let (ctx, _rx) = context(&[]);
        let pick = pick_version(&ctx, "Foo", "system", Some("1.5")).unwrap();
        assert_eq!(pick.available, vec!["1.0", "2.0"]);
        assert_eq!(pick.selected, "1.0");

        let newest = pick_version(&ctx, "Foo", "system", None).unwrap();
        assert_eq!(newest.selected, "2.0");

        assert!(pick_version(&ctx, "Foo", "GCC/8.2.0-2.31.1", None).is_err());
    }

    #[test]
    fn test_tweak_writes_records_for_new_toolchain() {
        let (ctx, _rx) = context(&[]);
        let dir = tempfile::tempdir().unwrap();
        let report = tweak(
            &ctx,
            &specs(&["numpy-1.15.0-GCC-7.3.0-2.30-Python-3.6.6.eb"]),
            "GCC/8.2.0-2.31.1",
            Some(dir.path()),
        )
        .unwrap();

        assert_eq!(
            report.suffixes.get("-Python-3.6.6").map(String::as_str),
            Some("-Python-3.7.2")
        );
        let modules: Vec<&str> = report.records.iter().map(|r| r.module.as_str()).collect();
        assert!(modules.contains(&"numpy/1.15.0-GCC-8.2.0-2.31.1-Python-3.7.2"));
        for record in &report.records {
            let path = record.written_to.as_ref().unwrap();
            assert!(path.is_file());
            assert_eq!(path.file_name().unwrap().to_string_lossy(), record.file_name);
        }
    }

    #[test]
    fn test_tweak_rejects_mixed_toolchains() {
        let (ctx, _rx) = context(&[]);
        let err = tweak(
            &ctx,
            &specs(&["zlib-1.2.8.eb", "zlib-1.2.11-GCCcore-7.3.0.eb"]),
            "GCC/8.2.0-2.31.1",
            None,
        )
        .unwrap_err();
        assert_eq!(err.user_code(), Some("ops.mixed_toolchains"));
    }

    #[test]
    fn test_skip_available_drops_installed_requests() {
        let mut config = Config::default();
        config.resolve.skip_available = true;
        let (ctx, mut rx) = context_with(config, &["gzip/1.4"]);

        let report = resolve(&ctx, &specs(&["gzip-1.4.eb", "App-1.0.eb"])).unwrap();
        assert_eq!(report.skipped, vec!["gzip/1.4".to_string()]);
        let order: Vec<&str> = report.order.iter().map(|m| m.module.as_str()).collect();
        assert_eq!(order.len(), 4);
        assert!(!order.contains(&"gzip/1.4"));
        assert_eq!(order.last(), Some(&"App/1.0"));

        let mut skipped = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Resolver(ResolverEvent::AlreadyInstalled { module }) = message.event {
                skipped.push(module);
            }
        }
        assert_eq!(skipped, vec!["gzip/1.4".to_string()]);

        let nothing_left = resolve(&ctx, &specs(&["gzip-1.4.eb"])).unwrap();
        assert!(nothing_left.order.is_empty());

        let (ctx, _rx) = context(&["gzip/1.4"]);
        let report = resolve(&ctx, &specs(&["gzip-1.4.eb"])).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(report.order.last().map(|m| m.module.as_str()), Some("gzip/1.4"));
    }

    #[test]
    fn test_dep_graph_keeps_installed_dependencies() {
        let (ctx, _rx) = context(&["zlib/1.2.8"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphs").join("gzip.dot");

        let report = dep_graph(&ctx, &specs(&["gzip-1.4.eb"]), &path).unwrap();
        assert_eq!((report.nodes, report.edges), (2, 1));

        let dot = std::fs::read_to_string(&path).unwrap();
        assert!(dot.starts_with("digraph dependencies {"));
        assert!(dot.contains("\"gzip\" -> \"zlib\";"));
    }

    #[test]
    fn test_obtain_generates_newer_version() {
        let (ctx, mut rx) = context(&[]);
        let dir = tempfile::tempdir().unwrap();
        let request = EasyconfigRequest::new("Python")
            .with_version("3.7.4")
            .with_toolchain(&ToolchainRef::new("GCC", "8.3.0"));

        let report = obtain(&ctx, &request, Some(dir.path())).unwrap();
        assert!(report.generated);
        assert_eq!(report.module, "Python/3.7.4-GCC-8.3.0");
        assert_eq!(
            report.template.file_name().unwrap().to_string_lossy(),
            "Python-3.7.2-GCC-8.2.0-2.31.1.eb"
        );
        let written = report.written_to.unwrap();
        assert_eq!(written, dir.path().join("Python-3.7.4-GCC-8.3.0.eb"));
        assert!(std::fs::read_to_string(&written).unwrap().contains("3.7.4"));

        let mut picked = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Tweak(TweakEvent::VersionPicked { name, selected, .. }) = message.event {
                picked.push(format!("{name} {selected}"));
            }
        }
        assert_eq!(picked, vec!["GCC 8.2.0-2.31.1", "Python 3.7.2"]);
    }

    #[test]
    fn test_obtain_existing_is_not_written() {
        let (ctx, _rx) = context(&[]);
        let dir = tempfile::tempdir().unwrap();
        let request = EasyconfigRequest::new("gzip");

        let report = obtain(&ctx, &request, Some(dir.path())).unwrap();
        assert!(!report.generated);
        assert_eq!(report.module, "gzip/1.4");
        assert!(report.written_to.is_none());

        let err = obtain(&ctx, &EasyconfigRequest::new("zlib"), None).unwrap_err();
        assert_eq!(err.user_code(), Some("easyconfig.ambiguous_toolchain"));
    }

    #[test]
    fn test_operations_emit_lifecycle_events() {
        let (ctx, mut rx) = context(&[]);
        let report = run_operation(&ctx, "resolve", |ctx| resolve(ctx, &specs(&["gzip-1.4.eb"]))).unwrap();
        assert_eq!(report.order.len(), 2);

        let mut started = false;
        let mut completed = false;
        while let Ok(message) = rx.try_recv() {
            match message.event {
                AppEvent::General(GeneralEvent::OperationStarted { operation }) => {
                    started = operation == "resolve";
                }
                AppEvent::General(GeneralEvent::OperationCompleted { operation, success }) => {
                    completed = operation == "resolve" && success;
                }
                _ => {}
            }
        }
        assert!(started && completed);
    }
}
