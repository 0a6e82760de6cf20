//! Selecting, or generating from the closest match, an easyconfig for a request

use crate::select::pick_version;
use hpcstack_errors::{EasyconfigError, Error};
use hpcstack_events::{EventEmitter, EventSender, TweakEvent};
use hpcstack_index::{easyconfig_to_yaml, EasyconfigSource};
use hpcstack_types::{EasyConfig, LooseVersion, ToolchainRef, SYSTEM_TOOLCHAIN_NAME};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// What the caller wants installed; unset fields are picked from what exists
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EasyconfigRequest {
    pub name: String,
    pub version: Option<String>,
    pub toolchain_name: Option<String>,
    pub toolchain_version: Option<String>,
    pub versionsuffix: Option<String>,
}

impl EasyconfigRequest {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_toolchain_name(mut self, name: impl Into<String>) -> Self {
        self.toolchain_name = Some(name.into());
        self
    }

    /// Request a full toolchain; the system toolchain has no version
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: &ToolchainRef) -> Self {
        self.toolchain_name = Some(toolchain.name.clone());
        self.toolchain_version = (!toolchain.is_system()).then(|| toolchain.version.clone());
        self
    }

    #[must_use]
    pub fn with_versionsuffix(mut self, versionsuffix: impl Into<String>) -> Self {
        self.versionsuffix = Some(versionsuffix.into());
        self
    }
}

/// Outcome of [`Obtainer::obtain`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObtainedEasyconfig {
    pub ec: EasyConfig,
    /// Existing easyconfig that was returned or used as the template
    pub template: PathBuf,
    /// Whether `ec` differs from the template
    pub generated: bool,
}

impl ObtainedEasyconfig {
    /// `<name>-<full version>.eb`
    #[must_use]
    pub fn file_name(&self) -> String {
        self.ec.filename()
    }

    /// YAML form of the record
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(easyconfig_to_yaml(&self.ec)?)
    }
}

/// Narrows the easyconfigs of a software down to one for a request
pub struct Obtainer<'a> {
    source: &'a dyn EasyconfigSource,
    tx: Option<EventSender>,
}

impl<'a> Obtainer<'a> {
    #[must_use]
    pub fn new(source: &'a dyn EasyconfigSource) -> Self {
        Self { source, tx: None }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    /// Pick the easyconfig closest to `request`, generating a copy when no
    /// existing one matches every requested field
    ///
    /// The toolchain name must be requested unless only one is available.
    /// Toolchain version and software version are picked with
    /// [`pick_version`]. A versionsuffix must be requested unless the
    /// remaining easyconfigs agree on one.
    ///
    /// # Errors
    ///
    /// Returns an error if no easyconfig exists for the software, the
    /// requested toolchain is not available, a choice is ambiguous, or a
    /// candidate cannot be parsed.
    pub fn obtain(&self, request: &EasyconfigRequest) -> Result<ObtainedEasyconfig, Error> {
        let name = request.name.as_str();
        let mut candidates = self.all_easyconfigs(name)?;
        if candidates.is_empty() {
            return Err(EasyconfigError::NoEasyconfigsFor { name: name.to_string() }.into());
        }

        let tc_name = select_toolchain_name(name, request, &candidates)?;
        candidates.retain(|(_, ec)| ec.toolchain.name == tc_name);

        let tc_version = if tc_name == SYSTEM_TOOLCHAIN_NAME {
            String::new()
        } else {
            let versions = distinct(candidates.iter().map(|(_, ec)| ec.toolchain.version.clone()));
            let (required, selected) = pick_version(request.toolchain_version.as_deref(), &versions)?;
            self.emit_tweak(TweakEvent::VersionPicked {
                name: tc_name.clone(),
                required: request.toolchain_version.clone(),
                selected: selected.clone(),
            });
            candidates.retain(|(_, ec)| ec.toolchain.version == selected);
            required
        };
        let toolchain = if tc_name == SYSTEM_TOOLCHAIN_NAME {
            ToolchainRef::system()
        } else {
            ToolchainRef::new(tc_name, tc_version)
        };

        let versions = distinct(candidates.iter().map(|(_, ec)| ec.version.clone()));
        let (version, selected) = pick_version(request.version.as_deref(), &versions)?;
        self.emit_tweak(TweakEvent::VersionPicked {
            name: name.to_string(),
            required: request.version.clone(),
            selected: selected.clone(),
        });
        let selected = LooseVersion::parse(&selected)?;
        candidates.retain(|(_, ec)| LooseVersion::parse(&ec.version).is_ok_and(|v| v == selected));

        let suffixes = distinct(candidates.iter().map(|(_, ec)| ec.versionsuffix.clone()));
        let versionsuffix = match &request.versionsuffix {
            Some(wanted) => {
                if suffixes.contains(wanted) {
                    candidates.retain(|(_, ec)| &ec.versionsuffix == wanted);
                }
                wanted.clone()
            }
            None => match suffixes.as_slice() {
                [only] => only.clone(),
                _ => {
                    return Err(EasyconfigError::AmbiguousVersionsuffix {
                        name: name.to_string(),
                        available: suffixes,
                    }
                    .into())
                }
            },
        };

        let (template, base) = match candidates.as_slice() {
            [(path, ec)] => (path.clone(), ec.clone()),
            _ => {
                return Err(EasyconfigError::NoUniqueMatch {
                    name: name.to_string(),
                    count: candidates.len(),
                }
                .into())
            }
        };

        let generated = base.version != version || base.toolchain != toolchain || base.versionsuffix != versionsuffix;
        let ec = if generated {
            regenerate(&base, &version, &toolchain, &versionsuffix)
        } else {
            base
        };

        tracing::debug!(template = %template.display(), module = %ec.full_mod_name(), generated, "obtained easyconfig");
        self.emit_tweak(TweakEvent::EasyconfigObtained {
            module: ec.full_mod_name(),
            template: template.display().to_string(),
            generated,
        });
        Ok(ObtainedEasyconfig {
            ec,
            template,
            generated,
        })
    }

    /// Every easyconfig of `name`, whatever its toolchain
    fn all_easyconfigs(&self, name: &str) -> Result<Vec<(PathBuf, EasyConfig)>, Error> {
        let mut found = Vec::new();
        for path in self.source.candidates(&format!("{name}-"), None)? {
            let ec = self.source.parse_easyconfig(&path)?;
            if ec.name == name {
                found.push((path, ec));
            }
        }
        Ok(found)
    }
}

impl EventEmitter for Obtainer<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

fn select_toolchain_name(
    name: &str,
    request: &EasyconfigRequest,
    candidates: &[(PathBuf, EasyConfig)],
) -> Result<String, Error> {
    let available = distinct(candidates.iter().map(|(_, ec)| ec.toolchain.name.clone()));
    match (&request.toolchain_name, available.as_slice()) {
        (Some(wanted), _) if available.contains(wanted) => Ok(wanted.clone()),
        (Some(wanted), _) => Err(EasyconfigError::ToolchainUnavailable {
            name: name.to_string(),
            toolchain: wanted.clone(),
            available,
        }
        .into()),
        (None, [only]) => Ok(only.clone()),
        (None, _) => Err(EasyconfigError::AmbiguousToolchain {
            name: name.to_string(),
            available,
        }
        .into()),
    }
}

/// Sorted distinct values
fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

/// Copy of `base` with new version fields; dependencies that inherited the
/// old toolchain follow the new one
fn regenerate(base: &EasyConfig, version: &str, toolchain: &ToolchainRef, versionsuffix: &str) -> EasyConfig {
    let mut ec = base.clone();
    ec.version = version.to_string();
    ec.versionsuffix = versionsuffix.to_string();
    ec.toolchain = toolchain.clone();
    for dep in ec
        .dependencies
        .iter_mut()
        .chain(ec.builddependencies.iter_mut())
        .filter(|dep| !dep.external_module && dep.toolchain == base.toolchain)
    {
        dep.toolchain = toolchain.clone();
    }
    ec
}
