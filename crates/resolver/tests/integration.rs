//! Integration tests for resolver crate

#[cfg(test)]
mod tests {
    use hpcstack_errors::{Error, ResolveError};
    use hpcstack_events::{AppEvent, ResolverEvent};
    use hpcstack_index::{EasyconfigSource, MemorySource, RobotPath, SearchOptions, StaticModules};
    use hpcstack_resolver::*;
    use hpcstack_types::{Dependency, EasyConfig, ToolchainRef};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn record(name: &str, version: &str, deps: &[(&str, &str)]) -> EasyConfig {
        let mut ec = EasyConfig::new(name, version, ToolchainRef::system());
        ec.dependencies = deps
            .iter()
            .map(|(n, v)| Dependency::new(*n, *v, ToolchainRef::system()))
            .collect();
        ec
    }

    fn request(ec: EasyConfig) -> PlanEntry {
        PlanEntry::new(ec, None)
    }

    /// Every dependency present in the plan comes before its dependent
    fn assert_topological(plan: &BuildPlan) {
        for (index, entry) in plan.iter().enumerate() {
            for dep in &entry.dependencies {
                if let Some(pos) = plan.position(&dep.full_mod_name()) {
                    assert!(pos < index, "{} must precede {}", dep, entry.full_mod_name);
                }
            }
        }
    }

    #[test]
    fn test_available_dependency_without_robot() {
        let source = MemorySource::new();
        let modules = StaticModules::new(["zlib/1.0"]);
        let options = ResolveOptions {
            robot: false,
            ..ResolveOptions::default()
        };

        let plan = resolve_dependencies(
            &[request(record("gzip", "1.4", &[("zlib", "1.0")]))],
            &source,
            &modules,
            options,
            None,
        )
        .unwrap();
        assert_eq!(plan.module_names(), vec!["gzip/1.4"]);
    }

    #[test]
    fn test_robot_chain_is_ordered() {
        let source = MemorySource::new()
            .with(record("B", "1.0", &[("C", "1.0")]))
            .with(record("C", "1.0", &[]));
        let modules = StaticModules::default();

        let plan = resolve_dependencies(
            &[request(record("A", "1.0", &[("B", "1.0")]))],
            &source,
            &modules,
            ResolveOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(plan.module_names(), vec!["C/1.0", "B/1.0", "A/1.0"]);
        assert_eq!(
            plan.get("B/1.0").and_then(|e| e.spec.clone()),
            Some(MemorySource::path_for("B", "1.0"))
        );
        assert_topological(&plan);
    }

    #[test]
    fn test_diamond_resolves_shared_dependency_once() {
        let source = MemorySource::new()
            .with(record("left", "1", &[("zlib", "1.2.11")]))
            .with(record("right", "1", &[("zlib", "1.2.11")]))
            .with(record("zlib", "1.2.11", &[]));
        let modules = StaticModules::default();

        let plan = resolve_dependencies(
            &[request(record("top", "1", &[("left", "1"), ("right", "1")]))],
            &source,
            &modules,
            ResolveOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.module_names().first().map(String::as_str), Some("zlib/1.2.11"));
        assert_eq!(plan.module_names().last().map(String::as_str), Some("top/1"));
        assert_topological(&plan);
    }

    #[test]
    fn test_toolchain_is_an_implicit_dependency() {
        let gcc = ToolchainRef::new("GCC", "7.3.0-2.30");
        let source = MemorySource::new().with(EasyConfig::new("GCC", "7.3.0-2.30", ToolchainRef::system()));
        let modules = StaticModules::default();

        let plan = resolve_dependencies(
            &[request(EasyConfig::new("zlib", "1.2.11", gcc))],
            &source,
            &modules,
            ResolveOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(
            plan.module_names(),
            vec!["GCC/7.3.0-2.30", "zlib/1.2.11-GCC-7.3.0-2.30"]
        );
    }

    #[test]
    fn test_retain_all_ignores_installed_modules() {
        let source = MemorySource::new().with(record("zlib", "1.0", &[]));
        let modules = StaticModules::new(["zlib/1.0"]);

        let plan = resolve_dependencies(
            &[request(record("gzip", "1.4", &[("zlib", "1.0")]))],
            &source,
            &modules,
            ResolveOptions::retain_all(),
            None,
        )
        .unwrap();
        assert_eq!(plan.module_names(), vec!["zlib/1.0", "gzip/1.4"]);
    }

    #[test]
    fn test_missing_easyconfig_becomes_placeholder_when_tolerated() {
        let source = MemorySource::new();
        let modules = StaticModules::new(["zlib/1.0"]);
        let (tx, mut rx) = hpcstack_events::channel();

        let plan = resolve_dependencies(
            &[request(record("gzip", "1.4", &[("zlib", "1.0")]))],
            &source,
            &modules,
            ResolveOptions::retain_all(),
            Some(tx),
        )
        .unwrap();
        assert_eq!(plan.module_names(), vec!["zlib/1.0", "gzip/1.4"]);
        assert!(plan.get("zlib/1.0").unwrap().is_placeholder());
        assert!(plan.get("gzip/1.4").unwrap().dependencies.is_empty());

        let mut saw_missing = false;
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Resolver(ResolverEvent::MissingEasyconfig { module }) = message.event {
                assert_eq!(module, "zlib/1.0");
                saw_missing = true;
            }
        }
        assert!(saw_missing);
    }

    #[test]
    fn test_missing_easyconfig_fails_when_not_tolerated() {
        let source = MemorySource::new();
        let modules = StaticModules::new(["zlib/1.0"]);
        let options = ResolveOptions {
            tolerate_missing_easyconfigs: false,
            ..ResolveOptions::retain_all()
        };

        let err = resolve_dependencies(
            &[request(record("gzip", "1.4", &[("zlib", "1.0")]))],
            &source,
            &modules,
            options,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolve(ResolveError::Irresolvable { ref missing }) if missing == &vec!["zlib/1.0".to_string()]
        ));
    }

    #[test]
    fn test_totally_missing_dependencies_are_batched() {
        let source = MemorySource::new();
        let modules = StaticModules::default();

        let err = resolve_dependencies(
            &[
                request(record("gzip", "1.4", &[("zlib", "1.0")])),
                request(record("tar", "1.30", &[("xz", "5.2"), ("zlib", "1.0")])),
            ],
            &source,
            &modules,
            ResolveOptions::default(),
            None,
        )
        .unwrap_err();
        let Error::Resolve(ResolveError::Irresolvable { missing }) = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(missing, vec!["zlib/1.0".to_string(), "xz/5.2".to_string()]);
    }

    #[test]
    fn test_external_module_must_exist() {
        let mut ec = record("app", "1.0", &[]);
        ec.dependencies.push(Dependency::external("cray-libsci"));
        let source = MemorySource::new();

        let missing = StaticModules::default();
        let err = resolve_dependencies(
            &[request(ec.clone())],
            &source,
            &missing,
            ResolveOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolve(ResolveError::MissingExternalModules { ref modules }) if modules == &vec!["cray-libsci".to_string()]
        ));

        let present = StaticModules::new(["cray-libsci/18.12.1"]);
        let plan = resolve_dependencies(
            &[request(ec.clone())],
            &source,
            &present,
            ResolveOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(plan.module_names(), vec!["app/1.0"]);

        // external modules count as resolved when the whole graph is retained
        let plan = resolve_dependencies(&[request(ec)], &source, &missing, ResolveOptions::retain_all(), None)
            .unwrap();
        assert_eq!(plan.module_names(), vec!["app/1.0"]);
    }

    #[test]
    fn test_robot_path_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let write = |rel: &str, body: &str| {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        };
        write(
            "b/bzip2/bzip2-1.0.6.eb",
            "name: bzip2\nversion: '1.0.6'\ntoolchain: system\n",
        );
        write(
            "z/zlib/zlib-1.2.11.eb",
            "name: zlib\nversion: '1.2.11'\ntoolchain: system\ndependencies:\n  - [bzip2, '1.0.6']\n",
        );

        let robot = RobotPath::new(vec![root.to_path_buf()], SearchOptions::default());
        let modules = StaticModules::default();
        let plan = resolve_dependencies(
            &[request(record("gzip", "1.6", &[("zlib", "1.2.11")]))],
            &robot,
            &modules,
            ResolveOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(plan.module_names(), vec!["bzip2/1.0.6", "zlib/1.2.11", "gzip/1.6"]);
    }

    #[test]
    fn test_top_level_requests_conflict() {
        let source = MemorySource::new()
            .with(record("Foo", "1.0", &[]))
            .with(record("Foo", "2.0", &[]));
        let modules = StaticModules::default();

        let report = check_conflicts(
            &[
                request(record("A", "1", &[("Foo", "1.0")])),
                request(record("B", "1", &[("Foo", "2.0")])),
            ],
            &source,
            &modules,
            true,
            None,
        )
        .unwrap();
        assert!(report.has_conflicts());
        assert_eq!(
            report.messages(),
            vec![
                "Conflict between (dependencies of) easyconfigs: Foo-1.0 as dep of: A-1 \
                 vs Foo-2.0 as dep of: B-1"
            ]
        );

        let report = check_conflicts(
            &[
                request(record("A", "1", &[("Foo", "1.0")])),
                request(record("B", "1", &[("Foo", "2.0")])),
            ],
            &source,
            &modules,
            false,
            None,
        )
        .unwrap();
        assert!(!report.has_conflicts());
    }

    #[test]
    fn test_conflict_detection_is_order_independent() {
        let source = MemorySource::new()
            .with(record("Foo", "1.0", &[]))
            .with(record("Foo", "2.0", &[]))
            .with(record("lib", "1", &[("Foo", "2.0")]));
        let modules = StaticModules::default();

        for deps in [
            [("Foo", "1.0"), ("lib", "1")],
            [("lib", "1"), ("Foo", "1.0")],
        ] {
            let report = ConflictChecker::new(&source, &modules)
                .with_inter_ec_conflicts(false)
                .check(&[request(record("app", "1", &deps))])
                .unwrap();
            assert_eq!(report.conflicts.len(), 1, "{:?}", report.messages());
            assert_eq!(report.conflicts[0].name, "Foo");
            assert_eq!(
                report.conflicts[0].versions,
                ("1.0".to_string(), "2.0".to_string())
            );
        }
    }

    /// Random DAG: node `i` depends only on nodes with a lower index
    fn dag() -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
        prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..4), 1..12).prop_map(
            |nodes| {
                nodes
                    .iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.iter().map(|pick| pick.index(i)).collect()
                        }
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_robot_resolves_every_node_in_dependency_order(graph in dag()) {
            let name = |i: usize| format!("P{i}");
            let mut source = MemorySource::new();
            for (i, deps) in graph.iter().enumerate() {
                let deps: Vec<(String, &str)> = deps.iter().map(|d| (name(*d), "1.0")).collect();
                let deps: Vec<(&str, &str)> = deps.iter().map(|(n, v)| (n.as_str(), *v)).collect();
                source.insert(record(&name(i), "1.0", &deps));
            }

            // request every node nothing else depends on
            let needed: BTreeSet<usize> = graph.iter().flatten().copied().collect();
            let requested: Vec<PlanEntry> = (0..graph.len())
                .filter(|i| !needed.contains(i))
                .map(|i| {
                    let path = MemorySource::path_for(&name(i), "1.0");
                    PlanEntry::new(source.parse_easyconfig(&path).unwrap(), Some(path))
                })
                .collect();

            let plan = resolve_dependencies(
                &requested,
                &source,
                &StaticModules::default(),
                ResolveOptions::default(),
                None,
            )
            .unwrap();

            prop_assert_eq!(plan.len(), graph.len());
            prop_assert_eq!(plan.placeholder_count(), 0);
            for (i, deps) in graph.iter().enumerate() {
                let at = plan.position(&format!("P{i}/1.0"));
                prop_assert!(at.is_some(), "P{} missing from plan", i);
                for dep in deps {
                    let dep_at = plan.position(&format!("P{dep}/1.0"));
                    prop_assert!(dep_at < at, "P{} must precede P{}", dep, i);
                }
            }
            assert_topological(&plan);
        }
    }
}
