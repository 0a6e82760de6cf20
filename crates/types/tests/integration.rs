//! Integration tests for types

#[cfg(test)]
mod tests {
    use hpcstack_types::*;
    use proptest::prelude::*;

    #[test]
    fn test_easyconfig_json_shape() {
        let mut ec = EasyConfig::new("gzip", "1.8", ToolchainRef::new("GCC", "4.9.3"));
        ec.dependencies.push(Dependency::new(
            "zlib",
            "1.2.8",
            ToolchainRef::new("GCC", "4.9.3"),
        ));
        let json = serde_json::to_value(&ec).unwrap();
        assert_eq!(json["name"], "gzip");
        assert_eq!(json["toolchain"]["name"], "GCC");
        assert_eq!(json["dependencies"][0]["name"], "zlib");
        assert!(json.get("multi_deps").is_none());

        let back: EasyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, ec);
    }

    #[test]
    fn test_spec_key_identity() {
        let ec = EasyConfig::new("zlib", "1.2.8", ToolchainRef::new("GCC", "4.9.3"));
        let dep = Dependency::new("zlib", "1.2.8", ToolchainRef::new("GCC", "4.9.3"));
        assert_eq!(ec.spec_key(), dep.spec_key());
        assert_eq!(ec.spec_key().to_string(), "zlib-1.2.8-GCC-4.9.3");
    }

    #[test]
    fn test_loose_version_sorting() {
        let mut versions: Vec<LooseVersion> = ["1.10", "1.9", "1.2.11", "2018b", "2018a"]
            .iter()
            .map(|s| LooseVersion::parse(s).unwrap())
            .collect();
        versions.sort();
        let sorted: Vec<&str> = versions.iter().map(LooseVersion::as_str).collect();
        assert_eq!(sorted, vec!["1.2.11", "1.9", "1.10", "2018a", "2018b"]);
    }

    proptest! {
        #[test]
        fn prop_numeric_versions_order_like_tuples(
            a in proptest::collection::vec(0u64..1000, 1..5),
            b in proptest::collection::vec(0u64..1000, 1..5),
        ) {
            let render = |parts: &[u64]| parts.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
            let va = LooseVersion::parse(&render(&a)).unwrap();
            let vb = LooseVersion::parse(&render(&b)).unwrap();
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }

        #[test]
        fn prop_ordering_is_antisymmetric(a in "[0-9a-z.]{1,8}", b in "[0-9a-z.]{1,8}") {
            prop_assume!(a.chars().any(|c| c != '.'));
            prop_assume!(b.chars().any(|c| c != '.'));
            let va = LooseVersion::parse(&a).unwrap();
            let vb = LooseVersion::parse(&b).unwrap();
            prop_assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse());
        }
    }
}
