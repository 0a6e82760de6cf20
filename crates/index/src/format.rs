//! YAML easyconfig format
//!
//! An easyconfig is a YAML mapping. Besides the fields of [`EasyConfig`],
//! any other keys (description, sources, build steps) are ignored here.
//!
//! ```yaml
//! easyblock: ConfigureMake
//! name: HDF5
//! version: '1.10.1'
//! toolchain: {name: foss, version: 2018b}
//! dependencies:
//!   - [zlib, '1.2.11']
//!   - [Szip, '2.1.1', '', {name: GCCcore, version: 7.3.0}]
//!   - {name: binutils, version: '2.30', toolchain: system}
//!   - [cray-libsci, EXTERNAL_MODULE]
//! multi_deps:
//!   Python: ['3.6.6', '2.7.15']
//! ```
//!
//! Dependencies without a toolchain inherit the record's toolchain.

use hpcstack_errors::EasyconfigError;
use hpcstack_types::{Dependency, EasyConfig, ToolchainRef, SYSTEM_TOOLCHAIN_NAME};
use serde::Deserialize;
use serde_yml::{Mapping, Value};
use std::collections::BTreeMap;

/// Marker used in dependency lists for modules provided outside hpcstack
pub const EXTERNAL_MODULE_MARKER: &str = "EXTERNAL_MODULE";

#[derive(Debug, Deserialize)]
struct RawEasyConfig {
    name: String,
    version: Value,
    #[serde(default)]
    versionprefix: String,
    #[serde(default)]
    versionsuffix: String,
    #[serde(default)]
    toolchain: Option<Value>,
    #[serde(default)]
    dependencies: Vec<Value>,
    #[serde(default)]
    builddependencies: Vec<Value>,
    #[serde(default)]
    multi_deps: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    easyblock: Option<String>,
}

/// Parse easyconfig text; `origin` names the source in error messages
///
/// # Errors
///
/// Returns `ParseFailed` for invalid YAML or malformed fields and
/// `InvalidMultiDeps` when `multi_deps` lists differ in length.
pub fn parse_easyconfig_str(contents: &str, origin: &str) -> Result<EasyConfig, EasyconfigError> {
    let fail = |message: String| EasyconfigError::ParseFailed {
        path: origin.to_string(),
        message,
    };

    let raw: RawEasyConfig = serde_yml::from_str(contents).map_err(|e| fail(e.to_string()))?;

    let version = scalar_to_string(&raw.version)
        .map_err(|e| fail(format!("version: {e}")))?;
    if version.is_empty() {
        return Err(fail("missing 'version'".to_string()));
    }

    let toolchain = match &raw.toolchain {
        Some(value) => parse_toolchain(value).map_err(|e| fail(format!("toolchain: {e}")))?,
        None => ToolchainRef::system(),
    };

    let parse_deps = |values: &[Value], field: &str| -> Result<Vec<Dependency>, EasyconfigError> {
        values
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                parse_dependency(value, &toolchain).map_err(|e| fail(format!("{field}[{idx}]: {e}")))
            })
            .collect()
    };

    let dependencies = parse_deps(&raw.dependencies, "dependencies")?;
    let builddependencies = parse_deps(&raw.builddependencies, "builddependencies")?;

    let mut multi_deps = BTreeMap::new();
    for (name, versions) in &raw.multi_deps {
        let versions = versions
            .iter()
            .map(|v| scalar_to_string(v).map_err(|e| fail(format!("multi_deps.{name}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        multi_deps.insert(name.clone(), versions);
    }

    let ec = EasyConfig {
        name: raw.name,
        version,
        versionprefix: raw.versionprefix,
        versionsuffix: raw.versionsuffix,
        toolchain,
        dependencies,
        builddependencies,
        multi_deps,
        hidden: raw.hidden,
        easyblock: raw.easyblock,
    };

    if ec.multi_deps_len().is_none() {
        return Err(EasyconfigError::InvalidMultiDeps {
            name: ec.name,
            message: "all entries must list the same number of versions".to_string(),
        });
    }

    Ok(ec)
}

/// Render a record as YAML that [`parse_easyconfig_str`] reads back
///
/// # Errors
///
/// Returns `SerializeFailed` if YAML serialization fails.
pub fn easyconfig_to_yaml(ec: &EasyConfig) -> Result<String, EasyconfigError> {
    serde_yml::to_string(ec).map_err(|e| EasyconfigError::SerializeFailed {
        name: ec.name.clone(),
        message: e.to_string(),
    })
}

/// Text of a scalar; floats are refused since YAML has already dropped
/// their trailing zeros (`1.10` reads as `1.1`)
fn scalar_to_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if n.is_f64() => Err(format!(
            "unquoted version {n} is read as a number, quote it (e.g. '{n}')"
        )),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err("expected a scalar".to_string()),
    }
}

fn parse_toolchain(value: &Value) -> Result<ToolchainRef, String> {
    match value {
        Value::Bool(true) | Value::Null => Ok(ToolchainRef::system()),
        Value::String(s) => ToolchainRef::parse_spec(s)
            .ok_or_else(|| format!("expected 'system' or NAME/VERSION, got '{s}'")),
        Value::Sequence(items) => match items.as_slice() {
            [name, version] => toolchain_from_parts(name, Some(version)),
            _ => Err("expected [name, version]".to_string()),
        },
        Value::Mapping(map) => toolchain_from_parts(
            map.get("name").ok_or("missing 'name'")?,
            map.get("version"),
        ),
        _ => Err("unsupported toolchain value".to_string()),
    }
}

fn toolchain_from_parts(name: &Value, version: Option<&Value>) -> Result<ToolchainRef, String> {
    let name = scalar_to_string(name).map_err(|e| format!("name: {e}"))?;
    if name.eq_ignore_ascii_case(SYSTEM_TOOLCHAIN_NAME) {
        return Ok(ToolchainRef::system());
    }
    let version = version
        .ok_or_else(|| "missing 'version'".to_string())
        .and_then(|v| scalar_to_string(v).map_err(|e| format!("version: {e}")))?;
    Ok(ToolchainRef::new(name, version))
}

fn parse_dependency(value: &Value, parent: &ToolchainRef) -> Result<Dependency, String> {
    match value {
        Value::Sequence(items) => dependency_from_sequence(items, parent),
        Value::Mapping(map) => dependency_from_mapping(map, parent),
        Value::String(name) => Ok(Dependency::new(name, "", parent.clone())),
        _ => Err("expected a sequence or a mapping".to_string()),
    }
}

fn dependency_from_sequence(items: &[Value], parent: &ToolchainRef) -> Result<Dependency, String> {
    let field = |idx: usize| -> Result<String, String> {
        items
            .get(idx)
            .map_or(Ok(String::new()), |v| {
                scalar_to_string(v).map_err(|e| format!("element {idx}: {e}"))
            })
    };

    let name = field(0)?;
    if name.is_empty() {
        return Err("missing name".to_string());
    }
    let version = field(1)?;
    if version == EXTERNAL_MODULE_MARKER {
        return Ok(Dependency::external(name));
    }

    let toolchain = match items.get(3) {
        Some(value) => parse_toolchain(value)?,
        None => parent.clone(),
    };
    Ok(Dependency::new(name, version, toolchain).with_suffix(field(2)?))
}

fn dependency_from_mapping(map: &Mapping, parent: &ToolchainRef) -> Result<Dependency, String> {
    // `{zlib: 1.2.11}` shorthand
    if map.get("name").is_none() {
        if let (1, Some((key, value))) = (map.len(), map.iter().next()) {
            let name = scalar_to_string(key).map_err(|e| format!("name: {e}"))?;
            let version = scalar_to_string(value).map_err(|e| format!("{name}: {e}"))?;
            return Ok(Dependency::new(name, version, parent.clone()));
        }
        return Err("missing 'name'".to_string());
    }

    let text = |key: &str| -> Result<String, String> {
        map.get(key).map_or(Ok(String::new()), |v| {
            scalar_to_string(v).map_err(|e| format!("'{key}': {e}"))
        })
    };
    let flag = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);

    let name = text("name")?;
    if flag("external_module") {
        let mut dep = Dependency::external(name);
        dep.version = text("version")?;
        return Ok(dep);
    }

    let toolchain = match map.get("toolchain") {
        Some(value) => parse_toolchain(value)?,
        None => parent.clone(),
    };
    let mut dep = Dependency::new(name, text("version")?, toolchain).with_suffix(text("versionsuffix")?);
    dep.hidden = flag("hidden");
    Ok(dep)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HDF5: &str = r"
easyblock: ConfigureMake
name: HDF5
version: '1.10.1'
homepage: https://www.hdfgroup.org
toolchain: {name: foss, version: 2018b}
dependencies:
  - [zlib, '1.2.11']
  - [Szip, '2.1.1', '', {name: GCCcore, version: 7.3.0}]
  - {name: binutils, version: '2.30', toolchain: system}
  - [cray-libsci, EXTERNAL_MODULE]
builddependencies:
  - {CMake: '3.12.1'}
";

    #[test]
    fn test_parse_dependency_forms() {
        let ec = parse_easyconfig_str(HDF5, "HDF5.eb").unwrap();
        assert_eq!(ec.full_mod_name(), "HDF5/1.10.1-foss-2018b");
        assert_eq!(ec.easyblock.as_deref(), Some("ConfigureMake"));

        let mods: Vec<String> = ec.dependencies.iter().map(Dependency::full_mod_name).collect();
        assert_eq!(
            mods,
            vec![
                "zlib/1.2.11-foss-2018b",
                "Szip/2.1.1-GCCcore-7.3.0",
                "binutils/2.30",
                "cray-libsci",
            ]
        );
        assert!(ec.dependencies[3].external_module);
        assert_eq!(ec.builddependencies[0].full_mod_name(), "CMake/3.12.1-foss-2018b");
    }

    #[test]
    fn test_missing_toolchain_is_system() {
        let ec = parse_easyconfig_str("name: zlib\nversion: '1.2.11'\n", "zlib.eb").unwrap();
        assert!(ec.toolchain.is_system());
        assert_eq!(ec.full_version(), "1.2.11");
    }

    #[test]
    fn test_integer_version_accepted() {
        let ec = parse_easyconfig_str("name: libfoo\nversion: 3\n", "libfoo.eb").unwrap();
        assert_eq!(ec.version, "3");
    }

    #[test]
    fn test_unquoted_float_version_rejected() {
        let err = parse_easyconfig_str("name: zlib\nversion: 1.10\n", "zlib.eb").unwrap_err();
        assert!(matches!(err, EasyconfigError::ParseFailed { .. }));
        assert!(err.to_string().contains("quote it"), "{err}");

        let err = parse_easyconfig_str(
            "name: gzip\nversion: '1.8'\ndependencies:\n  - [zlib, 1.20]\n",
            "gzip.eb",
        )
        .unwrap_err();
        assert!(err.to_string().contains("dependencies[0]"), "{err}");
        assert!(err.to_string().contains("quote it"), "{err}");

        let ec = parse_easyconfig_str(
            "name: gzip\nversion: '1.8'\ndependencies:\n  - [zlib, '1.20']\n",
            "gzip.eb",
        )
        .unwrap();
        assert_eq!(ec.dependencies[0].version, "1.20");
    }

    #[test]
    fn test_errors_carry_origin() {
        let err = parse_easyconfig_str("name: [broken", "/ecs/broken.eb").unwrap_err();
        assert!(matches!(err, EasyconfigError::ParseFailed { ref path, .. } if path == "/ecs/broken.eb"));

        let err = parse_easyconfig_str(
            "name: x\nversion: '1'\ndependencies:\n  - 42\n",
            "x.eb",
        )
        .unwrap_err();
        assert!(err.to_string().contains("dependencies[0]"));
    }

    #[test]
    fn test_multi_deps_length_mismatch() {
        let text = "name: Boost\nversion: '1.67.0'\nmulti_deps:\n  Python: ['3.6.6', '2.7.15']\n  numpy: ['1.15']\n";
        let err = parse_easyconfig_str(text, "Boost.eb").unwrap_err();
        assert!(matches!(err, EasyconfigError::InvalidMultiDeps { .. }));
    }

    #[test]
    fn test_yaml_output_reads_back() {
        let mut ec = parse_easyconfig_str(HDF5, "HDF5.eb").unwrap();
        ec.multi_deps.insert("Python".into(), vec!["3.6.6".into()]);
        let yaml = easyconfig_to_yaml(&ec).unwrap();
        let back = parse_easyconfig_str(&yaml, "out.eb").unwrap();
        assert_eq!(back, ec);
    }
}
