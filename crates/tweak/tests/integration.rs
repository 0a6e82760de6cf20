//! Integration tests for tweak crate

#[cfg(test)]
mod tests {
    use hpcstack_index::{EasyconfigSource, MemorySource, RobotPath, SearchOptions, StaticModules};
    use hpcstack_resolver::{resolve_dependencies, PlanEntry, ResolveOptions};
    use hpcstack_toolchain::{HierarchyBuilder, HierarchyMapper, ToolchainRegistry};
    use hpcstack_tweak::*;
    use hpcstack_types::{Dependency, EasyConfig, ToolchainRef};

    fn with_deps(mut ec: EasyConfig, deps: Vec<Dependency>) -> EasyConfig {
        ec.dependencies = deps;
        ec
    }

    /// Two GCC releases, each with binutils and a couple of Python versions
    fn robot() -> MemorySource {
        let system = ToolchainRef::system();
        let mut source = MemorySource::new();
        for (core, binutils, pythons) in [
            ("7.3.0", "2.30", ["2.7.15", "3.6.6"]),
            ("8.2.0", "2.31.1", ["2.7.16", "3.7.2"]),
        ] {
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
            source.insert(EasyConfig::new("zlib", "1.2.11", gcccore));
            for python in pythons {
                source.insert(with_deps(
                    EasyConfig::new("Python", python, gcc.clone()),
                    vec![Dependency::new("zlib", "1.2.11", ToolchainRef::new("GCCcore", core))],
                ));
            }
        }
        source
    }

    #[test]
    fn test_pick_version_scenarios() {
        let available = ["1.5", "1.20", "1.1", "1.50", "1.10", "1.9", "1.8"];
        assert_eq!(
            pick_version(Some("1.12"), &available).unwrap(),
            ("1.12".to_string(), "1.10".to_string())
        );
        assert_eq!(
            pick_version(Some("0.8"), &["1.5", "1.1", "1.10", "1.8"]).unwrap(),
            ("0.8".to_string(), "1.1".to_string())
        );
    }

    #[test]
    fn test_plan_is_moved_to_newer_toolchain() {
        let registry = ToolchainRegistry::builtin();
        let source = robot();
        let modules = StaticModules::default();
        let builder = HierarchyBuilder::new(&registry, &source);
        let gcc7 = ToolchainRef::new("GCC", "7.3.0-2.30");
        let gcc8 = ToolchainRef::new("GCC", "8.2.0-2.31.1");

        let mut app = EasyConfig::new("numpy", "1.15.0", gcc7.clone());
        app.versionsuffix = "-Python-3.6.6".to_string();
        app.dependencies
            .push(Dependency::new("Python", "3.6.6", gcc7.clone()));

        let plan = resolve_dependencies(
            &[PlanEntry::new(app, None)],
            &source,
            &modules,
            ResolveOptions::retain_all(),
            None,
        )
        .unwrap();

        let mapping = HierarchyMapper::new(&builder, &modules).map(&gcc7, &gcc8).unwrap();
        let suffixes = map_common_versionsuffixes("Python", &gcc7, &mapping, &builder, None).unwrap();
        assert_eq!(suffixes.get("-Python-3.6.6").map(String::as_str), Some("-Python-3.7.2"));

        let hierarchy = builder.build(&gcc7, false).unwrap();
        let tweaked = tweak_plan(&plan, &hierarchy, &mapping, &suffixes);
        let names: Vec<String> = tweaked.iter().map(|t| t.ec.full_mod_name()).collect();
        assert!(names.contains(&"numpy/1.15.0-GCC-8.2.0-2.31.1-Python-3.7.2".to_string()));
        assert!(names.contains(&"zlib/1.2.11-GCCcore-8.2.0".to_string()));
        // toolchains stay out, binutils/2.31.1 of the target is used instead
        assert!(!names.iter().any(|n| n.starts_with("GCC/") || n.starts_with("GCCcore/")));
        assert!(!names.iter().any(|n| n.starts_with("binutils/")));
        assert_eq!(
            mapping.carry_over_for("binutils").map(|v| v.version.as_str()),
            Some("2.31.1")
        );

        let numpy = tweaked.iter().find(|t| t.ec.name == "numpy").unwrap();
        assert_eq!(numpy.original, "numpy/1.15.0-GCC-7.3.0-2.30-Python-3.6.6");
        assert_eq!(numpy.ec.dependencies[0].full_mod_name(), "Python/3.6.6-GCC-8.2.0-2.31.1");
    }

    #[test]
    fn test_tweaked_records_round_trip_through_robot_path() {
        let mapping = hpcstack_toolchain::ToolchainMapping {
            toolchains: [(
                "GCCcore".to_string(),
                ToolchainRef::new("GCCcore", "8.2.0"),
            )]
            .into(),
            carry_over: std::collections::BTreeMap::new(),
        };
        let suffixes = SuffixMapping::new();
        let mut ec = EasyConfig::new("XZ", "5.2.4", ToolchainRef::new("GCCcore", "7.3.0"));
        ec.builddependencies.push(Dependency::new(
            "gettext",
            "0.19.8.1",
            ToolchainRef::system(),
        ));
        let record = TweakedRecord {
            original: ec.full_mod_name(),
            ec: tweak_record(&ec, &mapping, &suffixes),
        };

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x").join("XZ").join(record.file_name());
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, record.to_yaml().unwrap()).unwrap();

        let robot = RobotPath::new(vec![dir.path().to_path_buf()], SearchOptions::default());
        let found = robot.find_easyconfig("XZ", "5.2.4-GCCcore-8.2.0").unwrap().unwrap();
        let parsed = robot.parse_easyconfig(&found).unwrap();
        assert_eq!(parsed.full_mod_name(), "XZ/5.2.4-GCCcore-8.2.0");
        assert_eq!(parsed.builddependencies[0].full_mod_name(), "gettext/0.19.8.1");
    }
}
